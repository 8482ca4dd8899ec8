//! Page selection: parse `"1-3, 5, 10-13"` into an ordered set of pages.
//!
//! Pages are 1-indexed everywhere in the public API, matching what users
//! see in their PDF viewer. Conversion to 0-based indices happens only at
//! the pdfium/lopdf boundary.

use crate::error::PageRangeError;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A non-empty set of 1-indexed page numbers, enumerated in ascending order.
///
/// Membership drives the merge decision; ascending order drives
/// rasterisation and the layout of the replacement document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSet {
    pages: BTreeSet<u32>,
}

impl PageSet {
    /// Parse a page-range expression.
    ///
    /// Tokens are separated by commas; each is either `n` or `a-b`
    /// (inclusive). Whitespace around tokens and around the hyphen is
    /// ignored.
    ///
    /// ```
    /// use edgequake_pdfinvert::PageSet;
    ///
    /// let set = PageSet::parse("10-13").unwrap();
    /// assert_eq!(set.to_vec(), vec![10, 11, 12, 13]);
    /// assert_eq!(PageSet::parse("3,1,2").unwrap().to_vec(), vec![1, 2, 3]);
    /// assert!(PageSet::parse("3-").is_err());
    /// ```
    pub fn parse(expr: &str) -> Result<Self, PageRangeError> {
        if expr.trim().is_empty() {
            return Err(PageRangeError::Empty);
        }

        let mut pages = BTreeSet::new();
        for (position, raw) in expr.split(',').enumerate() {
            let token = raw.trim();
            if token.is_empty() {
                return Err(PageRangeError::EmptyToken {
                    expr: expr.to_string(),
                    position: position + 1,
                });
            }

            match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page(start, token)?;
                    let end = parse_page(end, token)?;
                    if end < start {
                        return Err(PageRangeError::Reversed {
                            token: token.to_string(),
                        });
                    }
                    pages.extend(start..=end);
                }
                None => {
                    pages.insert(parse_page(token, token)?);
                }
            }
        }

        Ok(Self { pages })
    }

    /// Build a set from explicit page numbers.
    pub fn from_pages(pages: impl IntoIterator<Item = u32>) -> Result<Self, PageRangeError> {
        let pages: BTreeSet<u32> = pages.into_iter().collect();
        if pages.is_empty() {
            return Err(PageRangeError::Empty);
        }
        if pages.contains(&0) {
            return Err(PageRangeError::ZeroPage {
                token: "0".to_string(),
            });
        }
        Ok(Self { pages })
    }

    /// Whether `page` (1-indexed) is selected.
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    /// Number of selected pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Always false for a successfully parsed set; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Highest selected page.
    pub fn max(&self) -> u32 {
        self.pages.last().copied().unwrap_or(0)
    }

    /// Selected pages in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Collapse consecutive pages back into `a-b` runs.
    fn runs(&self) -> Vec<(u32, u32)> {
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for page in self.iter() {
            match runs.last_mut() {
                Some((_, end)) if *end + 1 == page => *end = page,
                _ => runs.push((page, page)),
            }
        }
        runs
    }
}

/// Digits only: `u32::from_str` would otherwise accept a leading `+`.
fn parse_page(raw: &str, token: &str) -> Result<u32, PageRangeError> {
    let s = raw.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PageRangeError::Malformed {
            token: token.to_string(),
        });
    }
    let page: u32 = s.parse().map_err(|_| PageRangeError::Malformed {
        token: token.to_string(),
    })?;
    if page == 0 {
        return Err(PageRangeError::ZeroPage {
            token: token.to_string(),
        });
    }
    Ok(page)
}

impl FromStr for PageSet {
    type Err = PageRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .runs()
            .into_iter()
            .map(|(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{start}-{end}")
                }
            })
            .collect();
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn parses_inclusive_range() {
        assert_eq!(PageSet::parse("10-13").unwrap().to_vec(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn sorts_singles() {
        assert_eq!(PageSet::parse("3,1,2").unwrap().to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn deduplicates() {
        assert_eq!(PageSet::parse("5,5,5").unwrap().to_vec(), vec![5]);
        assert_eq!(PageSet::parse("1-3, 2-4").unwrap().to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn tolerates_whitespace() {
        let set = PageSet::parse("  1 - 3 ,\t5 , 8-9 ").unwrap();
        assert_eq!(set.to_vec(), vec![1, 2, 3, 5, 8, 9]);
    }

    #[test]
    fn single_page_range() {
        assert_eq!(PageSet::parse("7-7").unwrap().to_vec(), vec![7]);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(PageSet::parse(""), Err(PageRangeError::Empty));
        assert_eq!(PageSet::parse("   \t"), Err(PageRangeError::Empty));
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["a-b", "3-", "-3", "1-2-3", "x", "+4", "1.5", "2 3"] {
            let err = PageSet::parse(bad).unwrap_err();
            assert!(
                matches!(err, PageRangeError::Malformed { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_empty_entries() {
        assert!(matches!(
            PageSet::parse("1,,2"),
            Err(PageRangeError::EmptyToken { position: 2, .. })
        ));
        assert!(matches!(
            PageSet::parse("1,"),
            Err(PageRangeError::EmptyToken { .. })
        ));
    }

    #[test]
    fn rejects_zero_and_reversed() {
        assert!(matches!(PageSet::parse("0"), Err(PageRangeError::ZeroPage { .. })));
        assert!(matches!(PageSet::parse("0-2"), Err(PageRangeError::ZeroPage { .. })));
        assert!(matches!(PageSet::parse("5-3"), Err(PageRangeError::Reversed { .. })));
    }

    #[test]
    fn membership_and_bounds() {
        let set = PageSet::parse("2,4-5").unwrap();
        assert!(set.contains(2));
        assert!(!set.contains(3));
        assert!(set.contains(5));
        assert_eq!(set.len(), 3);
        assert_eq!(set.max(), 5);
        assert!(!set.is_empty());
    }

    #[test]
    fn display_is_compact() {
        let set = PageSet::parse("5, 1-3, 9, 10").unwrap();
        assert_eq!(set.to_string(), "1-3,5,9-10");
    }

    #[test]
    fn from_pages_validates() {
        assert_eq!(
            PageSet::from_pages([3, 1, 3]).unwrap().to_vec(),
            vec![1, 3]
        );
        assert_eq!(PageSet::from_pages(Vec::<u32>::new()), Err(PageRangeError::Empty));
        assert!(PageSet::from_pages([0, 1]).is_err());
    }

    #[test]
    fn from_str_matches_parse() {
        let set: PageSet = "4,2".parse().unwrap();
        assert_eq!(set.to_vec(), vec![2, 4]);
    }

    proptest! {
        #[test]
        fn output_is_strictly_ascending(
            tokens in prop::collection::vec((1u32..200, 0u32..5), 1..12)
        ) {
            let expr = tokens
                .iter()
                .map(|(start, len)| if *len == 0 {
                    start.to_string()
                } else {
                    format!("{}-{}", start, start + len)
                })
                .collect::<Vec<_>>()
                .join(",");
            let pages = PageSet::parse(&expr).unwrap().to_vec();
            prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
            for (start, len) in &tokens {
                for p in *start..=start + len {
                    prop_assert!(pages.contains(&p));
                }
            }
        }

        #[test]
        fn display_round_trips(pages in prop::collection::btree_set(1u32..500, 1..40)) {
            let set = PageSet::from_pages(pages.iter().copied()).unwrap();
            let reparsed = PageSet::parse(&set.to_string()).unwrap();
            prop_assert_eq!(reparsed, set);
        }
    }
}
