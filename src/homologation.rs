use crate::schema::{Channel, ContactOutcome, PortfolioType, ServiceLine};

const CALL_EFFECTIVE_KEYWORDS: &[&str] = &["CONTACTO", "COMPROMISO", "PROMESA", "ACEPTA"];
const CALL_NO_CONTACT_KEYWORDS: &[&str] = &["NO CONTESTA", "OCUPADO", "APAGADO", "BUZÓN"];

const VOICEBOT_EFFECTIVE_KEYWORDS: &[&str] = &["CONTACTO", "COMPROMISO"];
const VOICEBOT_NO_CONTACT_KEYWORDS: &[&str] = &["NO CONTESTA", "OCUPADO", "APAGADO"];

/// Maps a raw management typification onto the homologated contact outcome.
///
/// Effective keywords are checked before no-contact keywords, so a label such as
/// "NO CONTACTO" homologates as an effective contact, matching the warehouse rules.
pub fn homologate_outcome(
    channel: Channel,
    management: &str,
    commitment_flag: Option<&str>,
) -> ContactOutcome {
    let management = management.to_uppercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| management.contains(k));

    match channel {
        Channel::Call => {
            if contains_any(CALL_EFFECTIVE_KEYWORDS) {
                ContactOutcome::EffectiveContact
            } else if contains_any(CALL_NO_CONTACT_KEYWORDS) {
                ContactOutcome::NoContact
            } else {
                ContactOutcome::IneffectiveContact
            }
        }
        Channel::Voicebot => {
            let committed = commitment_flag
                .map(|flag| flag.trim().eq_ignore_ascii_case("SI"))
                .unwrap_or(false);

            if contains_any(VOICEBOT_EFFECTIVE_KEYWORDS) || committed {
                ContactOutcome::EffectiveContact
            } else if contains_any(VOICEBOT_NO_CONTACT_KEYWORDS) {
                ContactOutcome::NoContact
            } else {
                ContactOutcome::IneffectiveContact
            }
        }
    }
}

/// Portfolio type derived from the assignment file name.
pub fn classify_portfolio(file_name: &str) -> PortfolioType {
    if file_name.contains("_AN_") {
        PortfolioType::AltasNuevas
    } else if file_name.contains("_Temprana_") {
        PortfolioType::Temprana
    } else if file_name.contains("_CF_ANN_") {
        PortfolioType::Fraccionamiento
    } else {
        PortfolioType::Otro
    }
}

/// Only the MOVIL business line is mobile; everything else is fixed-line.
pub fn classify_service(business: &str) -> ServiceLine {
    if business.trim().eq_ignore_ascii_case("MOVIL") {
        ServiceLine::Movil
    } else {
        ServiceLine::Fijo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_homologation() {
        assert_eq!(
            homologate_outcome(Channel::Call, "Promesa de pago", None),
            ContactOutcome::EffectiveContact
        );
        assert_eq!(
            homologate_outcome(Channel::Call, "cliente acepta refinanciar", None),
            ContactOutcome::EffectiveContact
        );
        assert_eq!(
            homologate_outcome(Channel::Call, "Buzón de voz", None),
            ContactOutcome::NoContact
        );
        assert_eq!(
            homologate_outcome(Channel::Call, "NO CONTESTA", None),
            ContactOutcome::NoContact
        );
        assert_eq!(
            homologate_outcome(Channel::Call, "Tercero informa", None),
            ContactOutcome::IneffectiveContact
        );
    }

    #[test]
    fn test_effective_keywords_take_precedence() {
        assert_eq!(
            homologate_outcome(Channel::Call, "NO CONTACTO", None),
            ContactOutcome::EffectiveContact
        );
    }

    #[test]
    fn test_voicebot_homologation() {
        assert_eq!(
            homologate_outcome(Channel::Voicebot, "Mensaje completo", Some("si")),
            ContactOutcome::EffectiveContact
        );
        assert_eq!(
            homologate_outcome(Channel::Voicebot, "Compromiso", None),
            ContactOutcome::EffectiveContact
        );
        assert_eq!(
            homologate_outcome(Channel::Voicebot, "APAGADO", Some("NO")),
            ContactOutcome::NoContact
        );
        // Voicemail is not a no-contact keyword for the automated channel.
        assert_eq!(
            homologate_outcome(Channel::Voicebot, "BUZÓN", None),
            ContactOutcome::IneffectiveContact
        );
        assert_eq!(
            homologate_outcome(Channel::Voicebot, "Promesa", None),
            ContactOutcome::IneffectiveContact
        );
    }

    #[test]
    fn test_classify_portfolio() {
        assert_eq!(
            classify_portfolio("Cartera_AN_20250611"),
            PortfolioType::AltasNuevas
        );
        assert_eq!(
            classify_portfolio("Cartera_Temprana_20250611"),
            PortfolioType::Temprana
        );
        assert_eq!(
            classify_portfolio("Cartera_CF_ANN_20250611"),
            PortfolioType::Fraccionamiento
        );
        assert_eq!(classify_portfolio("Cartera_Tardia"), PortfolioType::Otro);
    }

    #[test]
    fn test_classify_service() {
        assert_eq!(classify_service("movil"), ServiceLine::Movil);
        assert_eq!(classify_service("FIJA"), ServiceLine::Fijo);
        assert_eq!(classify_service(""), ServiceLine::Fijo);
    }
}
