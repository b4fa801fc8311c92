//! The fixed questionnaire: 50 statements, ten per driver.

use super::Driver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub id: u32,
    pub text: &'static str,
    pub driver: Driver,
}

const fn q(id: u32, text: &'static str, driver: Driver) -> Question {
    Question { id, text, driver }
}

use super::Driver::{BeStrong, HurryUp, Perfectionist, PleaseOthers, TryHard};

pub const QUESTION_COUNT: usize = 50;

pub static QUESTIONS: [Question; QUESTION_COUNT] = [
    // Sei perfekt
    q(1, "Wenn ich eine Arbeit mache, dann mache ich sie gründlich.", Perfectionist),
    q(2, "Ich kontrolliere meine Ergebnisse mehrfach, um Fehler auszuschließen.", Perfectionist),
    q(3, "Es fällt mir schwer, mit etwas zufrieden zu sein, das 'nur' gut ist.", Perfectionist),
    q(4, "Rechtschreibfehler in Mails anderer stören mich sofort.", Perfectionist),
    q(5, "Ich ärgere mich lange über eigene kleine Fehler.", Perfectionist),
    q(6, "Ich bereite mich auf Gespräche extrem detailliert vor.", Perfectionist),
    q(7, "Unordnung macht mich nervös.", Perfectionist),
    q(8, "Ich drücke mich gerne sehr präzise und gewählt aus.", Perfectionist),
    q(9, "Ich erledige Dinge lieber selbst, damit sie richtig gemacht werden.", Perfectionist),
    q(10, "Kritik nehme ich mir sehr zu Herzen, auch wenn sie konstruktiv ist.", Perfectionist),
    // Sei schnell
    q(11, "Ich bin oft ungeduldig, wenn andere langsam sprechen.", HurryUp),
    q(12, "Ich unterbreche andere oft, weil ich weiß, was sie sagen wollen.", HurryUp),
    q(13, "Ich tue oft zwei Dinge gleichzeitig.", HurryUp),
    q(14, "Ich neige dazu, schneller zu sprechen als andere.", HurryUp),
    q(15, "Langsame Menschen nerven mich.", HurryUp),
    q(16, "Ich esse oft sehr schnell.", HurryUp),
    q(17, "Ich schaue oft auf die Uhr.", HurryUp),
    q(18, "Wenn ich nichts zu tun habe, werde ich unruhig.", HurryUp),
    q(19, "Ich treibe andere oft zur Eile an.", HurryUp),
    q(20, "Ich verlasse Meetings gerne früher, wenn es nichts mehr Wichtiges gibt.", HurryUp),
    // Streng dich an
    q(21, "Ich habe das Gefühl, dass ich mir Erfolge hart erarbeiten muss.", TryHard),
    q(22, "Ich beginne oft viele Projekte, ohne sie zu beenden.", TryHard),
    q(23, "Ich verwende oft Worte wie 'versuchen', 'bemühen', 'eigentlich'.", TryHard),
    q(24, "Leichte Aufgaben langweilen mich schnell.", TryHard),
    q(25, "Ich tue mich schwer, einfach mal nichts zu tun.", TryHard),
    q(26, "Wenn etwas leicht geht, traue ich dem Ergebnis nicht.", TryHard),
    q(27, "Ich bin oft erschöpft, auch wenn ich wenig sichtbare Ergebnisse habe.", TryHard),
    q(28, "Ich helfe gerne anderen, auch ungefragt.", TryHard),
    q(29, "Ich mache mir oft mehr Sorgen als nötig.", TryHard),
    q(30, "Ich habe oft das Gefühl, nicht genug getan zu haben.", TryHard),
    // Mach es allen recht
    q(31, "Es ist mir sehr wichtig, dass andere mich mögen.", PleaseOthers),
    q(32, "Ich kann schlecht 'Nein' sagen.", PleaseOthers),
    q(33, "Ich vermeide Konflikte um jeden Preis.", PleaseOthers),
    q(34, "Ich achte sehr auf die Stimmung anderer Leute.", PleaseOthers),
    q(35, "Ich stelle meine eigenen Bedürfnisse oft hinten an.", PleaseOthers),
    q(36, "Ich entschuldige mich oft, auch wenn ich nichts falsch gemacht habe.", PleaseOthers),
    q(37, "Ich lächle oft, auch wenn mir nicht danach zumute ist.", PleaseOthers),
    q(38, "Ich frage oft: 'Ist das okay für dich?'", PleaseOthers),
    q(39, "Ich habe Angst, andere zu enttäuschen.", PleaseOthers),
    q(40, "Ich übernehme oft Aufgaben, damit andere entlastet sind.", PleaseOthers),
    // Sei stark
    q(41, "Ich zeige ungern Gefühle.", BeStrong),
    q(42, "Ich bitte ungern um Hilfe.", BeStrong),
    q(43, "Ich beiße oft die Zähne zusammen.", BeStrong),
    q(44, "Ich bewahre auch in Krisen die Fassung.", BeStrong),
    q(45, "Sätze wie 'Das wird schon wieder' benutze ich oft.", BeStrong),
    q(46, "Ich mag es nicht, wenn andere jammern.", BeStrong),
    q(47, "Ich erledige Dinge oft alleine, weil ich niemanden zur Last fallen will.", BeStrong),
    q(48, "Ich wirke nach außen hin oft sehr beherrscht.", BeStrong),
    q(49, "Ich gebe Schwächen nur sehr ungern zu.", BeStrong),
    q(50, "Dinge wie Krankheit ignoriere ich so lange es geht.", BeStrong),
];
