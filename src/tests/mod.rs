
use crate::markers::{RefWord, DOLLAR, DOLLAR_PRIME};

/// A prefix-free parse of a generated text.
#[derive(Debug, Clone)]
pub(crate) struct Pfp {
    pub text: Vec<u8>,
    /// Distinct phrases in lexicographic order
    pub phrases: Vec<Vec<u8>>,
    /// Phrase id + 1 per parse position
    pub references: Vec<RefWord>,
}

/// Parses `DOLLAR body DOLLAR^w`, cutting at every window whose byte sum is
/// divisible by `modulus` and at every window starting with `DOLLAR_PRIME`.
pub(crate) fn prefix_free_parse(body: &[u8], w: usize, modulus: u32) -> Pfp {
    let mut text = vec![DOLLAR];
    text.extend_from_slice(body);
    text.extend(std::iter::repeat(DOLLAR).take(w));
    let n = text.len();

    // Windows inside the body only, then the closing window
    let mut cuts: Vec<usize> = (1..(n + 1).saturating_sub(2 * w))
        .filter(|&i| {
            let window = &text[i..i + w];
            window[0] == DOLLAR_PRIME || window.iter().map(|&b| b as u32).sum::<u32>() % modulus == 0
        })
        .collect();
    cuts.push(n - w);

    let mut parsed = Vec::with_capacity(cuts.len());
    let mut start = 0;
    for cut in cuts {
        parsed.push(text[start..cut + w].to_vec());
        start = cut;
    }

    let mut phrases = parsed.clone();
    phrases.sort();
    phrases.dedup();
    let references = parsed
        .iter()
        .map(|p| phrases.binary_search(p).unwrap() as RefWord + 1)
        .collect();

    Pfp {
        text,
        phrases,
        references,
    }
}

/// Concatenates referenced phrases, dropping each overlap of `w` bytes.
pub(crate) fn spell<P: AsRef<[u8]>>(
    phrases: &[P],
    references: impl IntoIterator<Item = RefWord>,
    w: usize,
) -> Vec<u8> {
    let mut text = Vec::new();
    for (i, r) in references.into_iter().enumerate() {
        let phrase = phrases[r as usize - 1].as_ref();
        text.extend_from_slice(if i == 0 { phrase } else { &phrase[w..] });
    }
    text
}

#[test]
fn test_prefix_free_parse_spells_text() {
    let pfp = prefix_free_parse(b"ACGTTGCAACGT", 2, 3);
    assert_eq!(pfp.text.first(), Some(&DOLLAR));
    assert_eq!(spell(&pfp.phrases, pfp.references.iter().copied(), 2), pfp.text);
    assert!(pfp.phrases.iter().all(|p| p.len() > 2));
}
