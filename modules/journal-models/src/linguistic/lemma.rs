//! Rule-based English lemmatizer.
//!
//! No part-of-speech information is available, so this is an irregular-form
//! table, a keep-list of forms that should not be reduced (adjectival
//! participles, -ing nouns), and Porter-style suffix rules with `e`
//! restoration.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static IRREGULAR: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        // be / have / do / go
        ("am", "be"), ("is", "be"), ("are", "be"), ("was", "be"), ("were", "be"),
        ("been", "be"), ("being", "be"), ("has", "have"), ("had", "have"),
        ("having", "have"), ("does", "do"), ("did", "do"), ("done", "do"),
        ("doing", "do"), ("goes", "go"), ("going", "go"), ("went", "go"), ("gone", "go"),
        // irregular verbs
        ("ran", "run"), ("ate", "eat"), ("eaten", "eat"), ("saw", "see"), ("seen", "see"),
        ("took", "take"), ("taken", "take"), ("gave", "give"), ("given", "give"),
        ("made", "make"), ("came", "come"), ("got", "get"), ("gotten", "get"),
        ("felt", "feel"), ("thought", "think"), ("bought", "buy"), ("brought", "bring"),
        ("caught", "catch"), ("taught", "teach"), ("fought", "fight"), ("sought", "seek"),
        ("found", "find"), ("left", "leave"), ("kept", "keep"), ("slept", "sleep"),
        ("wept", "weep"), ("met", "meet"), ("said", "say"), ("paid", "pay"),
        ("told", "tell"), ("sold", "sell"), ("held", "hold"), ("stood", "stand"),
        ("understood", "understand"), ("knew", "know"), ("known", "know"),
        ("grew", "grow"), ("grown", "grow"), ("threw", "throw"), ("thrown", "throw"),
        ("flew", "fly"), ("flown", "fly"), ("drew", "draw"), ("drawn", "draw"),
        ("wrote", "write"), ("written", "write"), ("rode", "ride"), ("ridden", "ride"),
        ("drove", "drive"), ("driven", "drive"), ("spoke", "speak"), ("spoken", "speak"),
        ("broke", "break"), ("broken", "break"), ("chose", "choose"), ("chosen", "choose"),
        ("woke", "wake"), ("woken", "wake"), ("forgot", "forget"), ("forgotten", "forget"),
        ("began", "begin"), ("begun", "begin"), ("sang", "sing"), ("sung", "sing"),
        ("swam", "swim"), ("drank", "drink"), ("drunk", "drink"), ("won", "win"),
        ("lost", "lose"), ("sent", "send"), ("spent", "spend"), ("built", "build"),
        ("lent", "lend"), ("meant", "mean"), ("heard", "hear"), ("sat", "sit"),
        ("fell", "fall"), ("fallen", "fall"), ("hid", "hide"), ("hidden", "hide"),
        ("led", "lead"), ("fed", "feed"), ("hung", "hang"), ("struck", "strike"),
        ("stuck", "stick"), ("dug", "dig"), ("shot", "shoot"), ("became", "become"),
        ("died", "die"), ("lied", "lie"), ("tied", "tie"), ("dying", "die"),
        ("lying", "lie"), ("ties", "tie"),
        // irregular plurals
        ("children", "child"), ("men", "man"), ("women", "woman"), ("feet", "foot"),
        ("teeth", "tooth"), ("mice", "mouse"), ("geese", "goose"), ("lives", "life"),
        ("wives", "wife"), ("knives", "knife"), ("shelves", "shelf"), ("wolves", "wolf"),
        ("leaves", "leaf"), ("halves", "half"), ("movies", "movie"), ("cookies", "cookie"),
        ("calories", "calorie"), ("selfies", "selfie"), ("zombies", "zombie"),
        ("aches", "ache"), ("headaches", "headache"), ("toothaches", "toothache"),
        // comparatives
        ("better", "good"), ("best", "good"), ("worse", "bad"), ("worst", "bad"),
    ]
    .into_iter()
    .collect()
});

static KEEP: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // adjectival participles
        "tired", "excited", "bored", "scared", "stressed", "worried", "annoyed",
        "frustrated", "exhausted", "overwhelmed", "relaxed", "interested", "surprised",
        "disappointed", "depressed", "motivated", "confused", "embarrassed", "ashamed",
        "amazed", "pleased", "satisfied", "relieved", "inspired", "blessed", "anxious",
        "interesting", "amazing", "exciting", "boring", "annoying", "relaxing",
        "confusing", "disappointing", "frustrating", "depressing", "terrifying",
        // -ing nouns and -s words that are not plurals
        "morning", "evening", "wedding", "building", "ceiling", "thing", "spring",
        "string", "nothing", "something", "anything", "everything", "during", "news",
        "yes", "series", "species", "always", "perhaps", "whereas", "lens", "chaos",
        "physics", "mathematics", "christmas", "glasses",
    ]
    .into_iter()
    .collect()
});

/// Lowercase base form of `word`.
pub fn lemmatize(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some(lemma) = IRREGULAR.get(lower.as_str()) {
        return lemma.to_string();
    }
    if lower.len() <= 3 || !lower.is_ascii() || KEEP.contains(lower.as_str()) {
        return lower;
    }
    strip_suffix(&lower).unwrap_or(lower)
}

fn strip_suffix(word: &str) -> Option<String> {
    if let Some(stem) = word.strip_suffix("ies") {
        if stem.len() >= 2 {
            return Some(format!("{stem}y"));
        }
    }
    if let Some(stem) = word.strip_suffix("ied") {
        if stem.len() >= 2 {
            return Some(format!("{stem}y"));
        }
    }
    if ["sses", "ches", "shes", "xes", "zzes"]
        .iter()
        .any(|suffix| word.ends_with(suffix))
    {
        return Some(word[..word.len() - 2].to_string());
    }
    if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") && !word.ends_with("is")
    {
        return Some(word[..word.len() - 1].to_string());
    }
    if let Some(stem) = word.strip_suffix("ed") {
        if stem.len() >= 3 && !word.ends_with("eed") && has_vowel(stem) {
            return Some(restore_stem(stem));
        }
    }
    if let Some(stem) = word.strip_suffix("ing") {
        if stem.len() >= 3 && has_vowel(stem) {
            return Some(restore_stem(stem));
        }
    }
    None
}

/// Undo consonant doubling (stopp -> stop) or restore a dropped `e`
/// (hop -> hope, creat -> create).
fn restore_stem(stem: &str) -> String {
    let b = stem.as_bytes();
    let n = b.len();

    if n >= 2 && b[n - 1] == b[n - 2] && is_consonant(b[n - 1]) && !matches!(b[n - 1], b'l' | b's' | b'z')
    {
        return stem[..n - 1].to_string();
    }
    if ends_in_silent_e_cluster(stem) || is_short_cvc(b) {
        return format!("{stem}e");
    }
    stem.to_string()
}

/// `creat`, `relat`, `troubl`, `realiz`, `reduc`, `lov`. A vowel before
/// `at` (eat, treat, float) keeps the stem bare.
fn ends_in_silent_e_cluster(stem: &str) -> bool {
    if let Some(head) = stem.strip_suffix("at") {
        return stem == "creat" || head.bytes().last().is_some_and(is_consonant);
    }
    ["bl", "iz", "uc", "v"].iter().any(|end| stem.ends_with(end))
}

fn is_vowel(c: u8) -> bool {
    matches!(c, b'a' | b'e' | b'i' | b'o' | b'u')
}

fn has_vowel(stem: &str) -> bool {
    stem.bytes().any(is_vowel)
}

fn is_consonant(c: u8) -> bool {
    c.is_ascii_alphabetic() && !is_vowel(c)
}

/// `hop`, `shar`: short stem ending consonant-vowel-consonant (not w/x/y).
fn is_short_cvc(b: &[u8]) -> bool {
    let tail_ok = |i: usize| {
        is_consonant(b[i]) && is_vowel(b[i + 1]) && is_consonant(b[i + 2]) && !matches!(b[i + 2], b'w' | b'x' | b'y')
    };
    match b.len() {
        3 => tail_ok(0),
        4 => is_consonant(b[0]) && tail_ok(1),
        _ => false,
    }
}
