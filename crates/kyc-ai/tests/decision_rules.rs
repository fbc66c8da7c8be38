use kyc_ai::workflows::kyc::extraction::fallback_reading;
use kyc_ai::workflows::kyc::{
    check_consistency, decide, name_match_score, validate_document_number, AiVerificationStatus,
    DocumentCategory, DocumentType, ExtractedFields, KycStatus, NameVerdict, TemplateMatcher,
    VerificationThresholds,
};
use kyc_ai::workflows::loans::{monthly_installment, score_risk, RiskInputs, RiskRating};

fn salaried(monthly_income: f64) -> RiskInputs<'static> {
    RiskInputs {
        monthly_income,
        existing_emi: 0.0,
        credit_card_outstanding: 0.0,
        credit_score: Some(760),
        employment_type: "Salaried",
        loan_amount: 300_000.0,
    }
}

#[test]
fn document_numbers_follow_indian_formats() {
    assert!(validate_document_number(DocumentType::Aadhaar, "1234 5678 9012").is_ok());
    assert!(validate_document_number(DocumentType::Pan, "ABCDE1234F").is_ok());

    let error = validate_document_number(DocumentType::Pan, "abcde1234")
        .expect_err("short lowercase PAN is invalid");
    assert_eq!(error.document_type, DocumentType::Pan);
}

#[test]
fn case_and_spacing_do_not_affect_name_matching() {
    let score = name_match_score("Rajesh Kumar", "  RAJESH   KUMAR ");
    assert_eq!(score, 100);
    assert_eq!(NameVerdict::from_score(score), NameVerdict::Pass);
}

#[test]
fn fallback_readings_satisfy_their_own_templates() {
    let matcher = TemplateMatcher::new();

    for (code, kind) in [
        ("aadhaar", DocumentType::Aadhaar),
        ("pan", DocumentType::Pan),
        ("utility_bill", DocumentType::UtilityBill),
    ] {
        let reading = fallback_reading(kind);
        let result = matcher.match_document(code, &reading.ocr_text, Some(&reading.fields));
        assert!(result.is_valid, "{code} fallback should be valid");
        assert!(result.confidence >= 60.0);
        assert!(result.detected_type.is_none());
    }
}

#[test]
fn decision_bands_follow_confidence_and_flags() {
    let thresholds = VerificationThresholds::default();

    let clean = decide(true, 90.0, &thresholds);
    assert_eq!(clean.status, KycStatus::Verified);
    assert_eq!(clean.ai_verification_status, AiVerificationStatus::AutoApproved);

    let flagged = decide(false, 95.0, &thresholds);
    assert_eq!(flagged.status, KycStatus::UnderReview);

    let weak = decide(true, 79.99, &thresholds);
    assert_eq!(
        weak.ai_verification_status,
        AiVerificationStatus::ManualReviewRequired
    );
}

#[test]
fn mismatched_names_are_reported_as_errors() {
    let identity = ExtractedFields {
        name: Some("Rajesh Kumar".to_string()),
        ..ExtractedFields::default()
    };
    let pan = ExtractedFields {
        name: Some("Meera Iyer".to_string()),
        ..ExtractedFields::default()
    };

    let report = check_consistency(&[
        (DocumentCategory::Identity, &identity),
        (DocumentCategory::Pan, &pan),
    ]);

    assert!(!report.is_consistent());
    assert_eq!(report.name_scores.len(), 1);
    assert_eq!(report.name_scores[0].verdict, NameVerdict::Mismatch);
}

#[test]
fn risk_points_accumulate_into_ratings() {
    assert_eq!(score_risk(&salaried(100_000.0)).rating, RiskRating::Low);

    let stretched = RiskInputs {
        existing_emi: 42_000.0,
        credit_score: Some(640),
        ..salaried(100_000.0)
    };
    let assessment = score_risk(&stretched);
    assert_eq!(assessment.score, 40);
    assert_eq!(assessment.rating, RiskRating::High);
}

#[test]
fn installments_are_amortised_monthly() {
    assert_eq!(monthly_installment(100_000.0, 12.0, 12), 8884.88);
    assert_eq!(monthly_installment(24_000.0, 0.0, 24), 1000.0);
}
