use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref TOKEN_RE: Regex =
        Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        // Union of the English and German sets; philosophical corpora mix
        // both languages, so no language detection is attempted.
        let english: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves",
        ];
        let german: &[&str] = &[
            "aber","als","also","am","an","auch","auf","aus","bei","bin","bis","bist",
            "da","dadurch","daher","darum","das","dass","daß","dein","deine","dem","den","denn","der","des","dessen","deshalb","die","dies","diese","dieser","dieses","doch","dort","du","durch",
            "ein","eine","einem","einen","einer","eines","er","es","etwas","euer","eure",
            "für","hab","habe","haben","hat","hatte","hatten","hier","hinter",
            "ich","ihr","ihre","im","in","ist","ja","jede","jedem","jeden","jeder","jedes","jener","jenes","jetzt",
            "kann","kannst","können","könnt",
            "man","mein","meine","mit","muss","muß","müssen","nach","nachdem","nein","nicht","noch","nun","nur",
            "ob","oder","ohne","sehr","seid","sein","seine","sich","sie","sind","so","soll","sollen","sondern","sonst","soweit","sowie",
            "um","und","uns","unser","unsere","unter",
            "vom","von","vor","wann","warum","was","weiter","weitere","welche","welches","wenn","wer","werde","werden","werdet","wie","wieder","wir","wird","wirst","wo","woher","wohin",
            "zu","zum","zur","zwischen","über",
        ];
        english.iter().chain(german.iter()).copied().collect()
    };
    /// Spelled-out cardinals mapped to their numeric value, German and
    /// English together, with ASCII transliterations of the umlaut forms.
    static ref NUMBER_WORDS: HashMap<&'static str, u64> = {
        let entries: &[(&str, u64)] = &[
            // German
            ("null", 0), ("eins", 1), ("zwei", 2), ("drei", 3), ("vier", 4),
            ("fünf", 5), ("fuenf", 5), ("sechs", 6), ("sieben", 7), ("acht", 8),
            ("neun", 9), ("zehn", 10), ("elf", 11), ("zwölf", 12), ("zwoelf", 12),
            ("dreizehn", 13), ("vierzehn", 14), ("fünfzehn", 15), ("fuenfzehn", 15),
            ("sechzehn", 16), ("siebzehn", 17), ("achtzehn", 18), ("neunzehn", 19),
            ("zwanzig", 20), ("dreißig", 30), ("dreissig", 30), ("vierzig", 40),
            ("fünfzig", 50), ("fuenfzig", 50), ("sechzig", 60), ("siebzig", 70),
            ("achtzig", 80), ("neunzig", 90), ("hundert", 100), ("tausend", 1000),
            // English
            ("zero", 0), ("one", 1), ("two", 2), ("three", 3), ("four", 4),
            ("five", 5), ("six", 6), ("seven", 7), ("eight", 8), ("nine", 9),
            ("ten", 10), ("eleven", 11), ("twelve", 12), ("thirteen", 13),
            ("fourteen", 14), ("fifteen", 15), ("sixteen", 16), ("seventeen", 17),
            ("eighteen", 18), ("nineteen", 19), ("twenty", 20), ("thirty", 30),
            ("forty", 40), ("fifty", 50), ("sixty", 60), ("seventy", 70),
            ("eighty", 80), ("ninety", 90), ("hundred", 100), ("thousand", 1000),
        ];
        entries.iter().copied().collect()
    };
    static ref GERMAN_UNITS: HashMap<&'static str, u64> = {
        let entries: &[(&str, u64)] = &[
            ("ein", 1), ("zwei", 2), ("drei", 3), ("vier", 4), ("fünf", 5),
            ("fuenf", 5), ("sechs", 6), ("sieben", 7), ("acht", 8), ("neun", 9),
        ];
        entries.iter().copied().collect()
    };
    static ref GERMAN_TENS: HashMap<&'static str, u64> = {
        let entries: &[(&str, u64)] = &[
            ("zwanzig", 20), ("dreißig", 30), ("dreissig", 30), ("vierzig", 40),
            ("fünfzig", 50), ("fuenfzig", 50), ("sechzig", 60), ("siebzig", 70),
            ("achtzig", 80), ("neunzig", 90),
        ];
        entries.iter().copied().collect()
    };
}

/// Returns the numeric value of a spelled-out cardinal, if the token is one.
///
/// Covers the German and English lexicons plus composed German tens of the
/// form "einundzwanzig". The lookup expects an already lowercased token.
pub fn spelled_number_value(token: &str) -> Option<u64> {
    if let Some(&v) = NUMBER_WORDS.get(token) {
        return Some(v);
    }
    // "einundzwanzig" = unit + "und" + ten
    let idx = token.find("und")?;
    let (unit, rest) = token.split_at(idx);
    let ten = &rest[3..];
    match (GERMAN_UNITS.get(unit), GERMAN_TENS.get(ten)) {
        (Some(&u), Some(&t)) => Some(u + t),
        _ => None,
    }
}

/// True when the token is a recognized spelled-out number word.
pub fn is_spelled_number(token: &str) -> bool {
    spelled_number_value(token).is_some()
}

fn is_digit_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Stemming algorithm selection for the optional final stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemLanguage {
    German,
    English,
}

/// Per-stage toggles for the normalization pipeline.
///
/// Ingestion and query paths must share one `Normalizer` (and therefore one
/// config); diverging configurations silently degrade matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// NFKC-normalize and lowercase before tokenizing.
    pub case_folding: bool,
    /// Drop tokens found in the combined German/English stopword set.
    pub stopword_removal: bool,
    /// Rewrite digit sequences and spelled-out cardinals to one canonical
    /// digit string ("zwölf" and "12" both become "12").
    pub number_canonicalization: bool,
    /// Split compounds into known sub-terms, emitting compound and parts.
    pub compound_splitting: bool,
    /// Known sub-terms for compound decomposition, lowercased.
    pub compound_lexicon: Vec<String>,
    /// Snowball-stem surviving tokens (digits are never stemmed).
    pub stemming: Option<StemLanguage>,
    /// Tokens shorter than this are dropped unless they are all digits.
    pub min_token_length: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            case_folding: true,
            stopword_removal: true,
            number_canonicalization: true,
            compound_splitting: false,
            compound_lexicon: Vec::new(),
            stemming: None,
            min_token_length: 2,
        }
    }
}

/// Turns raw text into the canonical token sequence used on both the
/// ingestion and query paths.
pub struct Normalizer {
    config: NormalizerConfig,
    compound_lexicon: HashSet<String>,
    stemmer: Option<Stemmer>,
}

// Minimum chars a compound fragment must have to count as a sub-term.
const MIN_COMPOUND_PART: usize = 4;

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let compound_lexicon = config
            .compound_lexicon
            .iter()
            .map(|t| t.to_lowercase())
            .collect();
        let stemmer = config.stemming.map(|lang| match lang {
            StemLanguage::German => Stemmer::create(Algorithm::German),
            StemLanguage::English => Stemmer::create(Algorithm::English),
        });
        Self {
            config,
            compound_lexicon,
            stemmer,
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize `text` into an ordered token sequence. Pure: identical input
    /// yields an identical sequence. Empty input yields an empty sequence.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let folded: Cow<'_, str> = if self.config.case_folding {
            Cow::Owned(text.nfkc().collect::<String>().to_lowercase())
        } else {
            Cow::Borrowed(text)
        };
        let mut tokens = Vec::new();
        for mat in TOKEN_RE.find_iter(&folded) {
            let raw = mat.as_str();
            if self.config.stopword_removal && is_stopword(raw) {
                continue;
            }
            let token: Cow<'_, str> = if self.config.number_canonicalization {
                canonicalize_number(raw)
            } else {
                Cow::Borrowed(raw)
            };
            let digits = is_digit_token(&token);
            if !digits && token.chars().count() < self.config.min_token_length {
                continue;
            }
            if self.config.compound_splitting && !digits {
                if let Some(parts) = self.decompose(&token) {
                    // Additive: the compound itself stays so exact-compound
                    // queries still match.
                    self.emit(&mut tokens, &token, digits);
                    for part in &parts {
                        self.emit(&mut tokens, part, false);
                    }
                    continue;
                }
            }
            self.emit(&mut tokens, &token, digits);
        }
        tokens
    }

    fn emit(&self, out: &mut Vec<String>, token: &str, digits: bool) {
        match (&self.stemmer, digits) {
            (Some(stemmer), false) => out.push(stemmer.stem(token).to_string()),
            _ => out.push(token.to_string()),
        }
    }

    /// Greedy longest-prefix decomposition against the compound lexicon,
    /// tolerating a German linking "s" between parts. Returns `None` unless
    /// the whole token decomposes into at least two known sub-terms.
    fn decompose(&self, token: &str) -> Option<Vec<String>> {
        if self.compound_lexicon.is_empty() || token.chars().count() < 2 * MIN_COMPOUND_PART {
            return None;
        }
        let parts = decompose_rec(token, &self.compound_lexicon)?;
        if parts.len() >= 2 {
            Some(parts)
        } else {
            None
        }
    }
}

fn decompose_rec(word: &str, lexicon: &HashSet<String>) -> Option<Vec<String>> {
    if word.is_empty() {
        return Some(Vec::new());
    }
    let boundaries: Vec<usize> = word
        .char_indices()
        .map(|(i, _)| i)
        .skip(1)
        .chain(std::iter::once(word.len()))
        .collect();
    // Longest prefix first so "weltanschauung" wins over "welt" + remainder.
    for &end in boundaries.iter().rev() {
        let (head, tail) = word.split_at(end);
        if head.chars().count() < MIN_COMPOUND_PART || !lexicon.contains(head) {
            continue;
        }
        let tail = tail.strip_prefix('s').unwrap_or(tail);
        if let Some(mut rest) = decompose_rec(tail, lexicon) {
            let mut parts = vec![head.to_string()];
            parts.append(&mut rest);
            return Some(parts);
        }
    }
    None
}

/// Rewrite a token to its canonical digit-string form if it is a digit
/// sequence or a recognized spelled-out cardinal; leave it alone otherwise.
fn canonicalize_number(token: &str) -> Cow<'_, str> {
    if is_digit_token(token) {
        // strip leading zeros so "012" and "12" agree
        return match token.parse::<u64>() {
            Ok(v) => Cow::Owned(v.to_string()),
            Err(_) => Cow::Borrowed(token),
        };
    }
    match spelled_number_value(token) {
        Some(v) => Cow::Owned(v.to_string()),
        None => Cow::Borrowed(token),
    }
}
