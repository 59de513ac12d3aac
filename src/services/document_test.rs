use super::*;

// =============================================================================
// extension_for
// =============================================================================

#[test]
fn extension_for_accepts_the_allowlist() {
    assert_eq!(extension_for("application/pdf"), Some("pdf"));
    assert_eq!(extension_for("image/jpeg"), Some("jpg"));
    assert_eq!(extension_for("image/png"), Some("png"));
}

#[test]
fn extension_for_ignores_case_and_parameters() {
    assert_eq!(extension_for("Application/PDF"), Some("pdf"));
    assert_eq!(extension_for("image/png; charset=binary"), Some("png"));
    assert_eq!(extension_for("  image/jpeg "), Some("jpg"));
}

#[test]
fn extension_for_rejects_everything_else() {
    for ct in ["", "text/html", "application/octet-stream", "image/svg+xml", "application/pdfx"] {
        assert_eq!(extension_for(ct), None, "expected rejection for {ct:?}");
    }
}

// =============================================================================
// sanitize_file_name
// =============================================================================

#[test]
fn sanitize_strips_path_components() {
    assert_eq!(sanitize_file_name("/etc/passwd"), "passwd");
    assert_eq!(sanitize_file_name("..\\..\\grades.pdf"), "grades.pdf");
    assert_eq!(sanitize_file_name("a/b/c/transcript.pdf"), "transcript.pdf");
}

#[test]
fn sanitize_drops_quotes_and_control_chars() {
    assert_eq!(sanitize_file_name("we\"ird\n.pdf"), "weird.pdf");
}

#[test]
fn sanitize_falls_back_for_empty_or_dot_names() {
    assert_eq!(sanitize_file_name(""), "document");
    assert_eq!(sanitize_file_name("   "), "document");
    assert_eq!(sanitize_file_name(".."), "document");
    assert_eq!(sanitize_file_name("dir/"), "document");
}

#[test]
fn sanitize_caps_length() {
    let long = "x".repeat(500);
    assert_eq!(sanitize_file_name(&long).chars().count(), 120);
}

#[test]
fn sanitize_keeps_ordinary_names() {
    assert_eq!(sanitize_file_name("passport scan (2).jpg"), "passport scan (2).jpg");
}

// =============================================================================
// DocumentKind
// =============================================================================

#[test]
fn kind_round_trips() {
    for kind in [
        DocumentKind::Passport,
        DocumentKind::Transcript,
        DocumentKind::Diploma,
        DocumentKind::LanguageCertificate,
        DocumentKind::MotivationLetter,
        DocumentKind::Other,
    ] {
        assert_eq!(DocumentKind::parse(kind.as_str()), Some(kind));
    }
}

#[test]
fn kind_rejects_unknown_values() {
    assert_eq!(DocumentKind::parse("selfie"), None);
    assert_eq!(DocumentKind::parse(""), None);
}

// =============================================================================
// serialization
// =============================================================================

#[test]
fn document_row_hides_storage_path() {
    let row = DocumentRow {
        id: Uuid::nil(),
        application_id: Uuid::nil(),
        uploaded_by: Uuid::nil(),
        kind: "passport".into(),
        file_name: "passport.pdf".into(),
        content_type: "application/pdf".into(),
        size_bytes: 1024,
        storage_path: "00000000-0000-0000-0000-000000000000.pdf".into(),
        created_at: "2026-08-01 10:00".into(),
    };
    let json = serde_json::to_value(&row).unwrap();
    assert!(json.get("storage_path").is_none());
    assert_eq!(json["file_name"], "passport.pdf");
}
