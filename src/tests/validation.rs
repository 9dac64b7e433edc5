use crate::auction::{
    validate::{self, position_field, BidForm, ValidationError},
    Position, Rules,
};
use std::collections::HashMap;

fn p(number: usize) -> Position {
    Position::from_index(number - 1)
}

fn raw(amounts: &[Option<i64>]) -> Vec<Option<i64>> {
    amounts.to_vec()
}

#[test]
fn accepts_non_increasing_vectors() -> anyhow::Result<()> {
    let rules = Rules::new(0, 3);

    let bids = validate::validate_bids(&raw(&[Some(500), Some(500), Some(0)]), &rules)?;
    assert_eq!(bids.as_slice(), &[500, 500, 0]);
    assert_eq!(bids.total(), 1000);
    assert_eq!(bids.get(p(2)), Some(500));
    assert_eq!(bids.get(p(4)), None);
    Ok(())
}

#[test]
fn reports_first_violation() {
    use ValidationError::*;
    let mut rules = Rules::new(0, 3);

    assert_eq!(
        validate::validate_bids(&raw(&[Some(5), None, Some(1)]), &rules),
        Err(IncompleteVector { position: p(2) })
    );
    assert_eq!(
        validate::validate_bids(&raw(&[Some(5), Some(4)]), &rules),
        Err(IncompleteVector { position: p(3) })
    );
    assert_eq!(
        validate::validate_bids(&raw(&[Some(5), Some(4), Some(3), Some(2)]), &rules),
        Err(UnexpectedPosition { position: p(4) })
    );
    assert_eq!(
        validate::validate_bids(&raw(&[Some(5), Some(-1), Some(-2)]), &rules),
        Err(NegativeBid {
            position: p(2),
            amount: -1
        })
    );
    assert_eq!(
        validate::validate_bids(&raw(&[Some(5), Some(6), Some(1)]), &rules),
        Err(NonMonotonicSequence {
            position: p(2),
            amount: 6,
            previous: 5
        })
    );

    rules.max_bid = Some(100);
    assert_eq!(
        validate::validate_bids(&raw(&[Some(101), Some(6), Some(1)]), &rules),
        Err(OutOfRange {
            position: p(1),
            amount: 101,
            max: 100
        })
    );

    rules.bid_sum_target = Some(30);
    assert_eq!(
        validate::validate_bids(&raw(&[Some(20), Some(6), Some(1)]), &rules),
        Err(SumMismatch {
            total: 27,
            expected: 30
        })
    );
    assert!(validate::validate_bids(&raw(&[Some(20), Some(6), Some(4)]), &rules).is_ok());
}

#[test]
fn zero_bids_are_fine() {
    let rules = Rules::new(0, 2);
    assert!(validate::validate_bids(&raw(&[Some(0), Some(0)]), &rules).is_ok());
}

#[test]
fn check_applies_current_rules() {
    let bids = crate::tests::bids(&[300, 200]);

    assert_eq!(validate::check(&bids, &Rules::new(0, 2)), Ok(()));
    assert_eq!(
        validate::check(&bids, &Rules::new(0, 3)),
        Err(ValidationError::IncompleteVector { position: p(3) })
    );
}

fn form(fields: &[(&str, &str)]) -> HashMap<String, String> {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn sanitizes_a_bidder_form() -> anyhow::Result<()> {
    let rules = Rules::new(0, 3);
    let fields = form(&[
        ("names", "  Alex & Jo "),
        ("email", "Alex@Example.com"),
        ("position_1", "$1,125"),
        ("position_2", "700.50"),
        ("position_3", "0"),
        ("comments", " see you there "),
    ]);

    let submission = BidForm::from_fields(&fields, rules.positions)
        .into_submission(&rules)?
        .expect("not spam");

    assert_eq!(submission.participant.id, "alex@example.com");
    assert_eq!(submission.participant.name, "Alex & Jo");
    assert_eq!(submission.participant.email, "Alex@Example.com");
    assert!(submission.participant.is_bidder);
    assert_eq!(submission.participant.headcount, 2);
    assert_eq!(
        submission.bids().map(|b| b.as_slice().to_vec()),
        Some(vec![112_500, 70_050, 0])
    );
    assert_eq!(submission.comments.as_deref(), Some("see you there"));
    Ok(())
}

#[test]
fn singles_do_not_bid() -> anyhow::Result<()> {
    let rules = Rules::new(0, 3);
    let fields = form(&[
        ("names", "Sam"),
        ("email", "sam@example.com"),
        ("single", "on"),
        ("position_1", "not a number"),
    ]);

    let submission = BidForm::from_fields(&fields, rules.positions)
        .into_submission(&rules)?
        .expect("not spam");

    assert!(!submission.participant.is_bidder);
    assert_eq!(submission.participant.headcount, 1);
    assert_eq!(submission.bids(), None);
    Ok(())
}

#[test]
fn collects_every_form_error() {
    let rules = Rules::new(0, 3);
    let fields = form(&[
        ("email", "not-an-email"),
        ("headcount", "zero"),
        ("position_1", "100"),
        ("position_2", "abc"),
        ("position_3", "50"),
    ]);

    let errors = BidForm::from_fields(&fields, rules.positions)
        .into_submission(&rules)
        .expect_err("invalid form");

    assert_eq!(errors.len(), 4);
    assert_eq!(errors.get("names"), Some("Names are required"));
    assert_eq!(
        errors.get("email"),
        Some("Please enter a valid email address")
    );
    assert_eq!(
        errors.get("headcount"),
        Some("Headcount must be a positive whole number")
    );
    assert!(errors.get(&position_field(p(2))).is_some());
}

#[test]
fn structural_errors_land_on_their_field() {
    let mut rules = Rules::new(0, 2);
    let base = [("names", "Robin"), ("email", "robin@example.com")];

    let fields = form(&[base[0], base[1], ("position_1", "100"), ("position_2", "200")]);
    let errors = BidForm::from_fields(&fields, rules.positions)
        .into_submission(&rules)
        .expect_err("increasing bids");
    assert_eq!(errors.len(), 1);
    assert!(errors.get("position_2").is_some());

    let fields = form(&[base[0], base[1], ("position_1", "100")]);
    let errors = BidForm::from_fields(&fields, rules.positions)
        .into_submission(&rules)
        .expect_err("missing bid");
    assert!(errors.get("position_2").is_some());

    rules.bid_sum_target = Some(50_000);
    let fields = form(&[base[0], base[1], ("position_1", "100"), ("position_2", "50")]);
    let errors = BidForm::from_fields(&fields, rules.positions)
        .into_submission(&rules)
        .expect_err("wrong total");
    assert!(errors.get("total").is_some());
}

#[test]
fn honeypot_drops_the_form() -> anyhow::Result<()> {
    let rules = Rules::new(0, 1);
    let fields = form(&[("bot-field", "gotcha"), ("names", "Bot")]);

    assert_eq!(
        BidForm::from_fields(&fields, rules.positions).into_submission(&rules)?,
        None
    );
    Ok(())
}

#[test]
fn email_is_required() {
    let rules = Rules::new(0, 1);
    let fields = form(&[("names", "Taylor"), ("position_1", "10")]);

    let errors = BidForm::from_fields(&fields, rules.positions)
        .into_submission(&rules)
        .expect_err("no email");
    assert_eq!(errors.get("email"), Some("Email is required"));
    assert_eq!(errors.to_string(), "email: Email is required");
}
