/// Name of the per-stage log file, e.g. `update-google-spreadsheet.log`.
///
/// Runs of anything other than ASCII letters and digits collapse into a
/// single dash, so two stage names differing only in punctuation share a file.
pub fn stage_log_name(stage: &str) -> String {
    let mut slug = String::with_capacity(stage.len());
    for c in stage.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "stage.log".to_string()
    } else {
        format!("{slug}.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_stage_names_map_to_log_files() {
        assert_eq!(stage_log_name("Fetch Cards From Trello"), "fetch-cards-from-trello.log");
        assert_eq!(stage_log_name("Update Google Spreadsheet"), "update-google-spreadsheet.log");
        assert_eq!(stage_log_name("Archive sync cards"), "archive-sync-cards.log");
    }

    #[test]
    fn punctuation_collapses_into_one_dash() {
        assert_eq!(stage_log_name("  Archive: sync/cards!! "), "archive-sync-cards.log");
        assert_eq!(stage_log_name("Upsert (v2) -- rows"), "upsert-v2-rows.log");
    }

    #[test]
    fn path_separators_never_escape_the_logs_dir() {
        assert_eq!(stage_log_name("../../etc/passwd"), "etc-passwd.log");
    }

    #[test]
    fn name_without_letters_or_digits_still_gets_a_file() {
        assert_eq!(stage_log_name("!!!"), "stage.log");
        assert_eq!(stage_log_name(""), "stage.log");
    }
}
