//! Descriptive profile per driver, used for the textual result summary.

use super::Driver;

#[derive(Debug, Clone, Copy)]
pub struct DriverProfile {
    pub title: &'static str,
    pub slogan: &'static str,
    pub gift: &'static str,
    pub danger: &'static str,
    pub tip: &'static str,
    /// Erlaubnissatz
    pub permission: &'static str,
    pub strategy: &'static str,
    pub coaching_question: &'static str,
}

pub fn profile(driver: Driver) -> &'static DriverProfile {
    match driver {
        Driver::Perfectionist => &PERFECTIONIST,
        Driver::HurryUp => &HURRY_UP,
        Driver::TryHard => &TRY_HARD,
        Driver::PleaseOthers => &PLEASE_OTHERS,
        Driver::BeStrong => &BE_STRONG,
    }
}

static PERFECTIONIST: DriverProfile = DriverProfile {
    title: "Der Perfektionist",
    slogan: "Ich muss alles zu 100% richtig machen.",
    gift: "Hohe Genauigkeit, Zuverlässigkeit, exzellente Planung, Fehlervermeidung.",
    danger: "Verliert sich in Details, wird nie fertig, kann nicht delegieren, Burnout-Gefahr.",
    tip: "Gut ist oft gut genug. Fehler sind Lernchancen.",
    permission: "Ich bin gut genug, so wie ich bin.",
    strategy: "Setze bewusste Zeitlimits für Aufgaben. Erlaube dir bewusst einen Fehler pro Tag (Die 90%-Regel).",
    coaching_question: "Was wäre das Schlimmste, das passiert, wenn es nicht perfekt ist?",
};

static HURRY_UP: DriverProfile = DriverProfile {
    title: "Der Antreiber zur Eile",
    slogan: "Ich muss schnell sein.",
    gift: "Schnelle Auffassungsgabe, hohe Dynamik, schafft viel in kurzer Zeit.",
    danger: "Hektik, Flüchtigkeitsfehler, Ungeduld mit anderen, innere Unruhe.",
    tip: "Nimm dir Zeit. Pausen erhöhen die Effizienz.",
    permission: "Ich darf mir Zeit nehmen.",
    strategy: "Plane bewusst Pufferzeiten vor Terminen ein. Atme 3x tief durch, bevor du antwortest.",
    coaching_question: "Wofür möchtest du dir mehr Zeit nehmen?",
};

static TRY_HARD: DriverProfile = DriverProfile {
    title: "Der Anstrenger",
    slogan: "Ich muss mich bemühen.",
    gift: "Ausdauer, Begeisterungsfähigkeit, Hilfsbereitschaft, Hartnäckigkeit.",
    danger: "Macht Dinge komplizierter als nötig, verzettelt sich, wird oft nicht fertig.",
    tip: "Tue es einfach, statt es zu versuchen. Ergebnis zählt mehr als Aufwand.",
    permission: "Ich darf es mir leicht machen.",
    strategy: "Fokussiere auf das Ziel, nicht den Weg. Frage dich bei jeder Aufgabe: 'Wie geht das einfach?'",
    coaching_question: "Was würdest du tun, wenn es ganz leicht wäre?",
};

static PLEASE_OTHERS: DriverProfile = DriverProfile {
    title: "Der Gefällige",
    slogan: "Ich muss es allen recht machen.",
    gift: "Empathie, Teamfähigkeit, Harmonie, Diplomatie.",
    danger: "Selbstaufgabe, mangelnde Abgrenzung, Konfliktunfähigkeit, wird ausgenutzt.",
    tip: "Nein sagen ist erlaubt. Kümmere dich auch um dich selbst.",
    permission: "Ich darf meine eigenen Bedürfnisse wichtig nehmen.",
    strategy: "Übe das 'Nein' sagen bei kleinen Bitten. Frage dich vor jeder Zusage: 'Will ich das wirklich?'",
    coaching_question: "Wenn du niemanden enttäuschen könntest, was würdest du tun?",
};

static BE_STRONG: DriverProfile = DriverProfile {
    title: "Der Starke",
    slogan: "Ich muss stark sein.",
    gift: "Krisenfestigkeit, Selbstständigkeit, Diskretion, Belastbarkeit.",
    danger: "Einzelgänger, emotionale Kälte, bricht plötzlich zusammen, fragt nicht nach Hilfe.",
    tip: "Gefühle zeigen ist eine Stärke. Hilfe annehmen entlastet.",
    permission: "Ich darf offen sein und um Hilfe bitten.",
    strategy: "Teile deine Gefühle mit einer Vertrauensperson. Bitte einmal pro Woche bewusst um Unterstützung.",
    coaching_question: "Wer könnte dich bei deiner aktuellen Herausforderung unterstützen?",
};
