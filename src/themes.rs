//! Static theme registry.
//!
//! Themes both filter listings and select the prompt sent to the
//! similarity endpoint. Not configurable at runtime.

/// A fixed theme category. Themes without a prompt are filter-only: they
/// appear in listing filters but cannot be chosen for submissions.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt: Option<&'static str>,
    pub system_instruction: Option<&'static str>,
}

impl Theme {
    /// A theme is submission-eligible when it carries a prompt.
    pub fn supports_ai(&self) -> bool {
        self.prompt.is_some()
    }
}

const SYSTEM_INSTRUCTION: &str = "You are a celebrity look-alike matcher. Name the single best-known \
     match for the person in the photo, starting your answer with one short \
     sentence of the form 'You look like <name>.', then briefly explain the \
     resemblance.";

const THEMES: &[Theme] = &[
    Theme {
        id: "celebrity",
        name: "Global Celebrity or Icon",
        prompt: Some(
            "Which globally famous celebrity or icon does the person in this \
             photo most resemble?",
        ),
        system_instruction: Some(SYSTEM_INSTRUCTION),
    },
    Theme {
        id: "football_player",
        name: "Football (Soccer) Player",
        prompt: Some(
            "Which professional football (soccer) player does the person in \
             this photo most resemble?",
        ),
        system_instruction: Some(SYSTEM_INSTRUCTION),
    },
    Theme {
        id: "politician",
        name: "Politician / Historical Figure",
        prompt: Some(
            "Which politician or historical figure does the person in this \
             photo most resemble?",
        ),
        system_instruction: Some(SYSTEM_INSTRUCTION),
    },
    Theme {
        id: "cartoon",
        name: "Cartoon / Animated Character",
        prompt: Some(
            "Which cartoon or animated character does the person in this \
             photo most resemble?",
        ),
        system_instruction: Some(SYSTEM_INSTRUCTION),
    },
    Theme {
        id: "meme",
        name: "Internet Meme / Funny Concept",
        prompt: Some(
            "Which internet meme or funny concept does the person in this \
             photo most resemble?",
        ),
        system_instruction: Some(SYSTEM_INSTRUCTION),
    },
    Theme {
        id: "80s_icons",
        name: "80s Rockstars & Pop Icons",
        prompt: Some(
            "Which 80s rockstar or pop icon does the person in this photo \
             most resemble?",
        ),
        system_instruction: Some(SYSTEM_INSTRUCTION),
    },
    Theme {
        id: "fantasy_scifi",
        name: "Fantasy & Sci-Fi Characters",
        prompt: Some(
            "Which fantasy or science-fiction character does the person in \
             this photo most resemble?",
        ),
        system_instruction: Some(SYSTEM_INSTRUCTION),
    },
    Theme {
        id: "art_history",
        name: "Iconic Art & Historical Figures",
        prompt: Some(
            "Which figure from iconic art or history does the person in this \
             photo most resemble?",
        ),
        system_instruction: Some(SYSTEM_INSTRUCTION),
    },
    // Filter-only event categories, kept for browsing older submissions.
    Theme {
        id: "elections_pt_2025",
        name: "Portuguese Elections 2025 (Funny Match)",
        prompt: None,
        system_instruction: None,
    },
    Theme {
        id: "world_cup_squads",
        name: "Football World Cup Squads Match",
        prompt: None,
        system_instruction: None,
    },
    Theme {
        id: "general",
        name: "General Celebrity/Character Match",
        prompt: Some(
            "Which well-known celebrity or character does the person in this \
             photo most resemble?",
        ),
        system_instruction: Some(SYSTEM_INSTRUCTION),
    },
];

/// All registered themes, for listing filter controls.
pub fn all() -> &'static [Theme] {
    THEMES
}

/// Looks up a theme by id.
pub fn get(id: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.id == id)
}

/// Themes eligible for submissions (those carrying a prompt).
pub fn ai_enabled() -> impl Iterator<Item = &'static Theme> {
    THEMES.iter().filter(|t| t.supports_ai())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let theme = get("celebrity").unwrap();
        assert_eq!(theme.name, "Global Celebrity or Icon");
        assert!(theme.supports_ai());
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(get("does_not_exist").is_none());
    }

    #[test]
    fn filter_only_themes_are_excluded_from_submissions() {
        assert!(!get("world_cup_squads").unwrap().supports_ai());
        assert!(!get("elections_pt_2025").unwrap().supports_ai());
        assert!(ai_enabled().all(|t| t.prompt.is_some() && t.system_instruction.is_some()));
        assert_eq!(ai_enabled().count(), all().len() - 2);
    }
}
