use regex::Regex;
use std::sync::OnceLock;

/// Priority-ordered company → lowercase pattern table. Earlier entries win
/// on ambiguity (PhonePe/Myntra precede Flipkart, which historically owned
/// both in source text).
const COMPANY_PATTERNS: &[(&str, &[&str])] = &[
    ("PhonePe", &["phonepe", "phone pe"]),
    ("Myntra", &["myntra", "myntra.com"]),
    ("PayPal", &["paypal", "paypal.com"]),
    ("PayTM", &["paytm", "paytm.com", "one97"]),
    ("Google", &["google", "alphabet", "goog", "google.com", "alphabet inc"]),
    ("Amazon", &["amazon", "amzn", "aws", "amazon.com", "amazon inc"]),
    ("Microsoft", &["microsoft", "msft", "microsoft.com", "microsoft corporation"]),
    ("Apple", &["apple", "aapl", "apple inc", "apple.com"]),
    ("Meta", &["meta", "facebook", "instagram", "whatsapp", "meta platforms"]),
    ("Netflix", &["netflix", "nflx", "netflix.com", "netflix inc"]),
    ("Flipkart", &["flipkart", "flipkart.com", "flipkart india"]),
    ("Zomato", &["zomato", "zomato.com"]),
    ("Swiggy", &["swiggy", "swiggy.com"]),
    ("Ola", &["ola", "ola cabs", "ola.com"]),
    ("Uber", &["uber", "uber.com"]),
    ("Razorpay", &["razorpay", "razorpay.com"]),
    ("Dream11", &["dream11", "dream 11"]),
    ("Carwale", &["carwale", "carwale.com", "car wale"]),
    ("BigBasket", &["bigbasket", "big basket"]),
    ("Grofers", &["grofers", "blinkit"]),
    ("Dunzo", &["dunzo", "dunzo.com"]),
    ("Freshworks", &["freshworks", "freshdesk", "freshservice"]),
    ("Zoho", &["zoho", "zoho.com"]),
    ("InMobi", &["inmobi", "inmobi.com"]),
    ("ShareChat", &["sharechat", "share chat"]),
    ("Nykaa", &["nykaa", "nykaa.com"]),
    ("PolicyBazaar", &["policybazaar", "policy bazaar"]),
    ("MakeMyTrip", &["makemytrip", "make my trip", "mmt"]),
    ("BookMyShow", &["bookmyshow", "book my show", "bms"]),
    ("Lenskart", &["lenskart", "lenskart.com"]),
    ("UrbanCompany", &["urbancompany", "urban company", "urbanclap", "urban clap"]),
    ("Cred", &["cred", "cred.com"]),
    ("Unacademy", &["unacademy", "unacademy.com"]),
    ("Vedantu", &["vedantu", "vedantu.com"]),
    ("Byju", &["byju", "byjus"]),
];

fn pattern_regexes() -> &'static Vec<(&'static str, Vec<Regex>)> {
    static CACHE: OnceLock<Vec<(&'static str, Vec<Regex>)>> = OnceLock::new();
    CACHE.get_or_init(|| {
        COMPANY_PATTERNS
            .iter()
            .map(|(name, patterns)| {
                let regexes = patterns
                    .iter()
                    .map(|p| Regex::new(&format!(r"\b{}\b", regex::escape(p))).unwrap())
                    .collect();
                (*name, regexes)
            })
            .collect()
    })
}

fn matches_any(text: &str, regexes: &[Regex]) -> bool {
    regexes.iter().any(|r| r.is_match(text))
}

/// Priority-ordered pattern matcher mapping free text to a canonical company
/// name. `target`, when given, is checked first so an adapter scraping for a
/// specific company doesn't lose to a higher-priority but incidental mention.
pub fn extract_company(title: &str, content: &str, target: Option<&str>) -> String {
    let text = format!("{} {}", title, content).to_lowercase();

    if let Some(target) = target {
        let target_lower = target.to_lowercase();
        if text.contains(&target_lower) {
            return target.to_string();
        }
        if let Some((_, regexes)) = pattern_regexes().iter().find(|(name, _)| *name == target) {
            if matches_any(&text, regexes) {
                return target.to_string();
            }
        }
    }

    for (name, regexes) in pattern_regexes() {
        if matches_any(&text, regexes) {
            return name.to_string();
        }
    }

    "Unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phonepe_precedes_flipkart() {
        let title = "PhonePe Interview Experience";
        let content = "I interviewed at PhonePe, we compete with Walmart and Flipkart";
        assert_eq!(extract_company(title, content, None), "PhonePe");
    }

    #[test]
    fn target_company_checked_first() {
        let title = "Generic title";
        let content = "Some unrelated company context, Myntra was mentioned once too";
        assert_eq!(
            extract_company(title, content, Some("Myntra")),
            "Myntra"
        );
    }

    #[test]
    fn word_boundary_prevents_partial_match() {
        // "golang" should not match "ola" substring.
        let title = "golang backend role";
        let content = "we use golang extensively";
        assert_eq!(extract_company(title, content, None), "Unknown");
    }

    #[test]
    fn unknown_when_nothing_matches() {
        assert_eq!(extract_company("title", "content", None), "Unknown");
    }
}
