//! Default reciter selection

use tilawah_common::types::Reciter;

/// Pick the default reciter from a fetched list
///
/// The first entry whose name case-insensitively contains the preferred
/// substring wins; otherwise the first entry in the list. Returns `None`
/// only for an empty list.
pub fn pick_default<'a>(reciters: &'a [Reciter], preferred: &str) -> Option<&'a Reciter> {
    let preferred = preferred.to_lowercase();
    if !preferred.is_empty() {
        if let Some(found) = reciters
            .iter()
            .find(|r| r.name.to_lowercase().contains(&preferred))
        {
            return Some(found);
        }
    }
    reciters.first()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reciter(id: u32, name: &str) -> Reciter {
        Reciter {
            id,
            name: name.to_string(),
            arabic_name: None,
        }
    }

    #[test]
    fn test_preferred_match_is_case_insensitive() {
        let list = vec![
            reciter(1, "AbdulBaset AbdulSamad"),
            reciter(7, "Mishari Rashid al-Afasy"),
        ];
        assert_eq!(pick_default(&list, "al-afasy").map(|r| r.id), Some(7));
        assert_eq!(pick_default(&list, "AL-AFASY").map(|r| r.id), Some(7));
    }

    #[test]
    fn test_falls_back_to_first_entry() {
        let list = vec![
            reciter(1, "AbdulBaset AbdulSamad"),
            reciter(7, "Mishari Rashid al-Afasy"),
        ];
        assert_eq!(pick_default(&list, "Husary").map(|r| r.id), Some(1));
        assert_eq!(pick_default(&list, "").map(|r| r.id), Some(1));
    }

    #[test]
    fn test_empty_list() {
        assert!(pick_default(&[], "Alafasy").is_none());
    }
}
