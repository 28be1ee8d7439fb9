use std::cmp::Ordering;

/// Compares file names the way a file browser lists them.
///
/// Letters compare case-insensitively and runs of digits compare by numeric
/// value, so `"2.mov"` sorts before `"10.mov"` and `"a.mov"` sits next to
/// `"A.mov"`. Names that are equal under those rules fall back to plain
/// ordering so the result is total.
pub fn localized_standard_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Segments::new(a);
    let mut right = Segments::new(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => match compare_segments(l, r) {
                Ordering::Equal => continue,
                ordering => return ordering,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());

        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;

        Some(if digits {
            Segment::Digits(head)
        } else {
            Segment::Text(head)
        })
    }
}

fn compare_segments(l: Segment<'_>, r: Segment<'_>) -> Ordering {
    match (l, r) {
        (Segment::Digits(x), Segment::Digits(y)) => compare_numeric(x, y),
        (Segment::Text(x), Segment::Text(y))
        | (Segment::Digits(x), Segment::Text(y))
        | (Segment::Text(x), Segment::Digits(y)) => compare_folded(x, y),
    }
}

fn compare_numeric(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

fn compare_folded(x: &str, y: &str) -> Ordering {
    x.chars()
        .flat_map(char::to_lowercase)
        .cmp(y.chars().flat_map(char::to_lowercase))
}
