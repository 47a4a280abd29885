use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four moods a user can check in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Calm,
    Anxious,
    Sad,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Happy, Mood::Calm, Mood::Anxious, Mood::Sad];

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Calm => "Calm",
            Mood::Anxious => "Anxious",
            Mood::Sad => "Sad",
        }
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Mood::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown mood: {}", s))
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Time-of-day partition of a day's check-ins. `Day` is the unslotted
/// check-in; storing it as its own value keeps the (user, date, slot)
/// unique index effective for unslotted rows too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Morning,
    Night,
    #[default]
    Day,
}

impl Slot {
    pub fn label(&self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Night => "night",
            Slot::Day => "day",
        }
    }

    /// What the content generator is told, if anything.
    pub fn time_of_day(&self) -> Option<&'static str> {
        match self {
            Slot::Morning => Some("morning"),
            Slot::Night => Some("night"),
            Slot::Day => None,
        }
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Slot::Morning),
            "night" => Ok(Slot::Night),
            "day" => Ok(Slot::Day),
            other => Err(format!("unknown slot: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeCategory {
    Breathing,
    Meditation,
    Movement,
    Grounding,
}

impl PracticeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            PracticeCategory::Breathing => "breathing",
            PracticeCategory::Meditation => "meditation",
            PracticeCategory::Movement => "movement",
            PracticeCategory::Grounding => "grounding",
        }
    }
}

impl FromStr for PracticeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breathing" => Ok(PracticeCategory::Breathing),
            "meditation" => Ok(PracticeCategory::Meditation),
            "movement" => Ok(PracticeCategory::Movement),
            "grounding" => Ok(PracticeCategory::Grounding),
            other => Err(format!("unknown practice category: {}", other)),
        }
    }
}

/// How the practice pacing felt to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pacing {
    TooFast,
    JustRight,
    TooSlow,
}

impl Pacing {
    pub fn label(&self) -> &'static str {
        match self {
            Pacing::TooFast => "Too fast",
            Pacing::JustRight => "Just right",
            Pacing::TooSlow => "Too slow",
        }
    }
}

impl FromStr for Pacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "too fast" => Ok(Pacing::TooFast),
            "just right" => Ok(Pacing::JustRight),
            "too slow" => Ok(Pacing::TooSlow),
            other => Err(format!("unknown pacing: {}", other)),
        }
    }
}

/// A generated (or canned) practice before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPractice {
    pub title: String,
    pub description: String,
    pub category: PracticeCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub practice: GeneratedPractice,
    pub journal_prompt: String,
}

/// Canned practice and prompt for when the content generator is unavailable
/// or returns something unusable. Unknown mood labels resolve to the Calm
/// entry.
pub fn fallback_content(mood_label: &str) -> GeneratedContent {
    let mood = mood_label.parse::<Mood>().unwrap_or(Mood::Calm);
    match mood {
        Mood::Happy => GeneratedContent {
            practice: GeneratedPractice {
                title: "Gratitude Breathing".to_string(),
                description: "1. Find a comfortable seated position.\n\
                              2. Take a deep breath in, thinking of one thing you're grateful for.\n\
                              3. As you exhale, let a smile naturally form.\n\
                              4. Repeat for 5-7 breaths, bringing to mind different things you appreciate.\n\
                              5. Notice the warmth of gratitude in your body."
                    .to_string(),
                category: PracticeCategory::Breathing,
            },
            journal_prompt: "What brought you joy today, and how did it feel in your body?"
                .to_string(),
        },
        Mood::Calm => GeneratedContent {
            practice: GeneratedPractice {
                title: "Body Scan Meditation".to_string(),
                description: "1. Sit or lie down comfortably.\n\
                              2. Close your eyes and take three deep breaths.\n\
                              3. Bring your attention to your feet, noticing any sensations.\n\
                              4. Slowly move your awareness up through your legs, torso, arms, and head.\n\
                              5. Spend 10-15 seconds on each area, simply observing without judgment.\n\
                              6. End by taking three more deep breaths."
                    .to_string(),
                category: PracticeCategory::Meditation,
            },
            journal_prompt: "What does peace feel like in your body right now?".to_string(),
        },
        Mood::Anxious => GeneratedContent {
            practice: GeneratedPractice {
                title: "4-7-8 Calming Breath".to_string(),
                description: "1. Sit comfortably with your back straight.\n\
                              2. Exhale completely through your mouth.\n\
                              3. Inhale through your nose for 4 counts.\n\
                              4. Hold your breath for 7 counts.\n\
                              5. Exhale through your mouth for 8 counts.\n\
                              6. Repeat this cycle 3-4 times.\n\
                              7. Return to normal breathing and notice how you feel."
                    .to_string(),
                category: PracticeCategory::Breathing,
            },
            journal_prompt: "What do you need to feel safe and grounded right now?".to_string(),
        },
        Mood::Sad => GeneratedContent {
            practice: GeneratedPractice {
                title: "Self-Compassion Hand on Heart".to_string(),
                description: "1. Place one or both hands over your heart.\n\
                              2. Feel the warmth and gentle pressure of your hands.\n\
                              3. Take slow, deep breaths.\n\
                              4. Silently say: \"May I be kind to myself. May I accept myself as I am.\"\n\
                              5. Continue for 2-3 minutes, breathing gently.\n\
                              6. Notice any shift in how you feel."
                    .to_string(),
                category: PracticeCategory::Meditation,
            },
            journal_prompt: "What would you say to comfort a dear friend who felt this way?"
                .to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mood_has_a_complete_fallback_entry() {
        for mood in Mood::ALL {
            let content = fallback_content(mood.label());
            assert!(!content.practice.title.trim().is_empty(), "{} title", mood);
            assert!(
                !content.practice.description.trim().is_empty(),
                "{} description",
                mood
            );
            assert!(!content.journal_prompt.trim().is_empty(), "{} prompt", mood);
        }
    }

    #[test]
    fn unknown_mood_falls_back_to_calm() {
        let calm = fallback_content("Calm");
        let unknown = fallback_content("Melancholy");
        assert_eq!(unknown, calm);
    }

    #[test]
    fn mood_labels_round_trip() {
        for mood in Mood::ALL {
            assert_eq!(mood.label().parse::<Mood>().unwrap(), mood);
        }
        assert!("Grumpy".parse::<Mood>().is_err());
        assert_eq!("anxious".parse::<Mood>().unwrap(), Mood::Anxious);
    }

    #[test]
    fn slot_time_of_day_is_omitted_for_unslotted_check_ins() {
        assert_eq!(Slot::Morning.time_of_day(), Some("morning"));
        assert_eq!(Slot::Night.time_of_day(), Some("night"));
        assert_eq!(Slot::Day.time_of_day(), None);
    }

    #[test]
    fn pacing_labels_parse() {
        assert_eq!("Just right".parse::<Pacing>().unwrap(), Pacing::JustRight);
        assert_eq!("too fast".parse::<Pacing>().unwrap(), Pacing::TooFast);
        assert_eq!("Too slow".parse::<Pacing>().unwrap(), Pacing::TooSlow);
        assert!("leisurely".parse::<Pacing>().is_err());
    }
}
