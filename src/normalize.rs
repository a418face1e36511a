/// Lowercase, drop everything that is not a letter, digit or whitespace, collapse
/// whitespace runs and trim. Idempotent.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(&normalize(a), &normalize(b))
}

fn soundex_class(c: char) -> u8 {
    match c {
        'B' | 'F' | 'P' | 'V' => 1,
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => 2,
        'D' | 'T' => 3,
        'L' => 4,
        'M' | 'N' => 5,
        'R' => 6,
        _ => 0,
    }
}

/// Four character Soundex code over the ASCII letters of `text` (spaces and digits are
/// skipped, so a multi-word street codes as one word). Empty when there are no letters.
///
/// Vowels, `H`, `W` and `Y` carry class 0 and reset the duplicate check, so a repeated
/// class separated by any of them is coded twice.
pub fn soundex(text: &str) -> String {
    let letters: Vec<char> = text
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let Some(&first) = letters.first() else {
        return String::new();
    };

    let mut code = String::with_capacity(4);
    code.push(first);
    let mut prev = soundex_class(first);

    for &c in &letters[1..] {
        if code.len() >= 4 {
            break;
        }
        let class = soundex_class(c);
        if class != 0 && class != prev {
            code.push(char::from(b'0' + class));
        }
        prev = class;
    }

    while code.len() < 4 {
        code.push('0');
    }
    code
}

pub fn sounds_alike(a: &str, b: &str) -> bool {
    let code = soundex(a);
    !code.is_empty() && code == soundex(b)
}
