//! quiz - the "Innere Antreiber" questionnaire and its score reducer
//!
//! Pure data and pure functions: the question list, per-driver totals, and the
//! system prompt handed to the voice coach at session start.

mod profile;
mod questions;

pub use profile::{profile, DriverProfile};
pub use questions::{Question, QUESTIONS, QUESTION_COUNT};

use std::fmt;

/// Highest total a single driver can reach (ten questions rated 5).
pub const MAX_DRIVER_SCORE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Driver {
    Perfectionist,
    HurryUp,
    TryHard,
    PleaseOthers,
    BeStrong,
}

impl Driver {
    /// Fixed iteration order. Ties in [`DriverScores::dominant`] resolve to the
    /// earliest driver in this list.
    pub const ALL: [Driver; 5] = [
        Driver::Perfectionist,
        Driver::HurryUp,
        Driver::TryHard,
        Driver::PleaseOthers,
        Driver::BeStrong,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Driver::Perfectionist => "Sei perfekt",
            Driver::HurryUp => "Sei schnell",
            Driver::TryHard => "Streng dich an",
            Driver::PleaseOthers => "Mach es allen recht",
            Driver::BeStrong => "Sei stark",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-driver totals, always holding all five drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverScores {
    totals: [u32; 5],
}

impl DriverScores {
    pub fn get(&self, driver: Driver) -> u32 {
        self.totals[driver.index()]
    }

    /// Drivers with their totals, in [`Driver::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Driver, u32)> + '_ {
        Driver::ALL.iter().map(move |&d| (d, self.get(d)))
    }

    /// The first driver (in iteration order) holding the maximum total.
    pub fn dominant(&self) -> (Driver, u32) {
        let mut best = (Driver::ALL[0], self.get(Driver::ALL[0]));
        for (driver, score) in self.iter().skip(1) {
            if score > best.1 {
                best = (driver, score);
            }
        }
        best
    }

    /// Highest total first; equal totals keep iteration order.
    pub fn ranked(&self) -> Vec<(Driver, u32)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// Sum the ratings per driver.
///
/// `answers[i]` is the rating for `QUESTIONS[i]`. Missing answers count as 0
/// and answers beyond the question list are ignored.
pub fn calculate_scores(answers: &[u8]) -> DriverScores {
    let mut scores = DriverScores::default();
    for (question, &rating) in QUESTIONS.iter().zip(answers) {
        scores.totals[question.driver.index()] += u32::from(rating);
    }
    scores
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreLevel {
    Low,
    Elevated,
    High,
}

impl ScoreLevel {
    pub fn of(score: u32) -> Self {
        if score >= 40 {
            ScoreLevel::High
        } else if score >= 30 {
            ScoreLevel::Elevated
        } else {
            ScoreLevel::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreLevel::High => "sehr hoch",
            ScoreLevel::Elevated => "hoch",
            ScoreLevel::Low => "moderat",
        }
    }
}

/// Build the coach's system instruction from a score snapshot.
pub fn system_prompt(scores: &DriverScores) -> String {
    let summary = scores
        .iter()
        .map(|(driver, score)| format!("{}: {}/{}", driver, score, MAX_DRIVER_SCORE))
        .collect::<Vec<_>>()
        .join(", ");
    let (dominant, dominant_score) = scores.dominant();

    format!(
        "Du bist ein erfahrener, empathischer Business Coach (Systemischer Ansatz).\n\
         Dein Klient hat gerade einen Test zu den \"Inneren Antreibern\" gemacht.\n\
         Hier sind die Ergebnisse: {summary}.\n\
         Der stärkste Antreiber ist \"{dominant}\" mit {dominant_score} Punkten.\n\
         \n\
         Eine Punktzahl über 40 ist sehr hoch, über 30 ist hoch.\n\
         Deine Aufgabe:\n\
         1. Helfe dem Klienten, die Ergebnisse zu reflektieren.\n\
         2. Frage, welcher Antreiber ihn am meisten belastet.\n\
         3. Gib kurze, prägnante Tipps, wie er Erlaubnissätze nutzen kann.\n\
         4. Sei freundlich, professionell, aber locker. Sprich Deutsch.\n\
         \n\
         Halte deine Antworten kurz und gesprächsorientiert (max 2-3 Sätze am Stück), damit ein Dialog entsteht."
    )
}
