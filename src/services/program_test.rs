use super::*;

// =============================================================================
// page_bounds
// =============================================================================

#[test]
fn page_bounds_defaults() {
    assert_eq!(page_bounds(None, None), (1, 20));
}

#[test]
fn page_bounds_clamps_low_values() {
    assert_eq!(page_bounds(Some(0), Some(0)), (1, 1));
    assert_eq!(page_bounds(Some(-3), Some(-10)), (1, 1));
}

#[test]
fn page_bounds_caps_page_size() {
    assert_eq!(page_bounds(Some(2), Some(5000)), (2, 100));
}

#[test]
fn page_bounds_passes_reasonable_values_through() {
    assert_eq!(page_bounds(Some(7), Some(50)), (7, 50));
}

// =============================================================================
// escape_like
// =============================================================================

#[test]
fn escape_like_escapes_wildcards() {
    assert_eq!(escape_like("100%_done"), "100\\%\\_done");
}

#[test]
fn escape_like_escapes_backslash_first() {
    assert_eq!(escape_like("a\\b"), "a\\\\b");
    assert_eq!(escape_like("\\%"), "\\\\\\%");
}

#[test]
fn escape_like_leaves_plain_text_alone() {
    assert_eq!(escape_like("Data Science"), "Data Science");
}

// =============================================================================
// valid_iso_date
// =============================================================================

#[test]
fn valid_iso_date_accepts_plain_dates() {
    assert!(valid_iso_date("2027-01-15"));
    assert!(valid_iso_date("1999-12-31"));
}

#[test]
fn valid_iso_date_rejects_bad_shapes() {
    for raw in ["", "2027-1-15", "15-01-2027", "2027/01/15", "2027-01-15T00:00:00", "not-a-date"] {
        assert!(!valid_iso_date(raw), "expected rejection for {raw:?}");
    }
}

#[test]
fn valid_iso_date_rejects_out_of_range_fields() {
    assert!(!valid_iso_date("2027-00-10"));
    assert!(!valid_iso_date("2027-13-10"));
    assert!(!valid_iso_date("2027-05-00"));
    assert!(!valid_iso_date("2027-05-32"));
}

// =============================================================================
// enums
// =============================================================================

#[test]
fn degree_level_round_trips() {
    for level in [
        DegreeLevel::Bachelor,
        DegreeLevel::Master,
        DegreeLevel::Phd,
        DegreeLevel::LanguageCourse,
    ] {
        assert_eq!(DegreeLevel::parse(level.as_str()), Some(level));
    }
    assert_eq!(DegreeLevel::parse("diploma"), None);
}

#[test]
fn program_sort_falls_back_to_deadline() {
    assert_eq!(ProgramSort::parse("tuition"), ProgramSort::Tuition);
    assert_eq!(ProgramSort::parse("name"), ProgramSort::Name);
    assert_eq!(ProgramSort::parse("deadline"), ProgramSort::Deadline);
    assert_eq!(ProgramSort::parse("shoe-size"), ProgramSort::Deadline);
    assert_eq!(ProgramSort::default(), ProgramSort::Deadline);
}
