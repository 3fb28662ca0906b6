use hcplog_core::domain::hcp::Hcp;
use hcplog_core::domain::interaction::Interaction;

/// Interactions considered when asking for follow-ups.
pub const SUGGESTION_HISTORY: u32 = 3;

pub fn suggestion_context(hcp: Option<&Hcp>, recent: &[Interaction]) -> String {
    let name = hcp.map(Hcp::display_name).unwrap_or("Unknown");
    let topics = recent
        .iter()
        .filter_map(|interaction| interaction.fields.topics.as_deref())
        .filter(|topics| !topics.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    format!("HCP: {name}. Recent topics: [{topics}]")
}

pub fn suggestion_prompt(context: &str) -> String {
    format!("Suggest 2-3 concise follow-up actions based on:\n{context}")
}

/// One suggestion per non-blank line, with list markers removed.
pub fn parse_suggestions(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.trim_matches(|ch: char| ch == '-' || ch.is_whitespace()))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use hcplog_core::chrono::Utc;

    use hcplog_core::domain::hcp::{Hcp, HcpId};
    use hcplog_core::domain::interaction::{Interaction, InteractionFields, InteractionId};

    use super::{parse_suggestions, suggestion_context, suggestion_prompt};

    fn interaction(id: i64, topics: Option<&str>) -> Interaction {
        Interaction {
            id: InteractionId(id),
            hcp_id: HcpId(1),
            fields: InteractionFields {
                topics: topics.map(str::to_string),
                ..InteractionFields::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn context_names_hcp_and_skips_empty_topics() {
        let hcp = Hcp {
            id: HcpId(1),
            name: "Dr. Lee".to_string(),
            specialty: None,
            organization: None,
        };
        let recent =
            vec![interaction(3, Some("Drug X efficacy")), interaction(2, None), interaction(1, Some("dosing"))];

        assert_eq!(
            suggestion_context(Some(&hcp), &recent),
            "HCP: Dr. Lee. Recent topics: [Drug X efficacy, dosing]"
        );
    }

    #[test]
    fn context_for_unknown_hcp_without_history() {
        assert_eq!(suggestion_context(None, &[]), "HCP: Unknown. Recent topics: []");
    }

    #[test]
    fn prompt_embeds_context_on_second_line() {
        let prompt = suggestion_prompt("HCP: Dr. Lee. Recent topics: []");
        assert_eq!(
            prompt,
            "Suggest 2-3 concise follow-up actions based on:\nHCP: Dr. Lee. Recent topics: []"
        );
    }

    #[test]
    fn markers_and_blank_lines_are_dropped() {
        let raw = "- Send the Drug X efficacy study\n\n  -  Schedule a follow-up call -\n---\nShare dosing guide";
        let suggestions = parse_suggestions(raw);

        assert_eq!(
            suggestions,
            vec![
                "Send the Drug X efficacy study".to_string(),
                "Schedule a follow-up call".to_string(),
                "Share dosing guide".to_string(),
            ]
        );
        let non_blank = raw.lines().filter(|line| !line.trim().is_empty()).count();
        assert!(suggestions.len() <= non_blank);
        assert!(suggestions.iter().all(|line| !line.starts_with("- ")));
    }

    #[test]
    fn empty_response_yields_no_suggestions() {
        assert!(parse_suggestions("").is_empty());
        assert!(parse_suggestions("\n  \n").is_empty());
    }
}
