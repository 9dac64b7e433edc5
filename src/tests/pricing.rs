use super::past_event_values;
use crate::auction::{
    assignment,
    pricing::{PaymentRule, PricingRule, SecondPricePayments, VcgPayments},
};

#[test]
fn past_event_payments() {
    let values = past_event_values();
    let (_, best) = assignment::optimal_assignment(&values, 5);

    assert_eq!(
        SecondPricePayments.payments(&values, 5, &best),
        vec![100_000, 70_000, 55_000, 50_000, 60_000]
    );
    assert_eq!(
        VcgPayments.payments(&values, 5, &best),
        vec![38_000, 13_000, 5_000, 0, 5_500]
    );
}

#[test]
fn second_price_never_exceeds_own_bid() {
    // welfare puts `b` on position 1 although `a` bids more for it
    let values = vec![vec![100, 90], vec![95, 10]];
    let (_, best) = assignment::optimal_assignment(&values, 2);
    assert_eq!(best, vec![1, 0]);

    assert_eq!(SecondPricePayments.payments(&values, 2, &best), vec![10, 95]);
    assert_eq!(VcgPayments.payments(&values, 2, &best), vec![0, 10]);
}

#[test]
fn lone_bidder_pays_nothing() {
    let values = vec![vec![500, 300]];
    let best = vec![0];

    assert_eq!(SecondPricePayments.payments(&values, 2, &best), vec![0]);
    assert_eq!(VcgPayments.payments(&values, 2, &best), vec![0]);
}

#[test]
fn vcg_payments_are_bounded() {
    let values = vec![
        vec![40, 30, 20, 10],
        vec![35, 35, 0, 0],
        vec![50, 10, 5, 5],
    ];
    let (_, best) = assignment::optimal_assignment(&values, 4);

    for (row, payment) in VcgPayments.payments(&values, 4, &best).into_iter().enumerate() {
        assert!(payment >= 0);
        assert!(payment <= values[row][best[row]]);
    }
}

#[test]
fn rule_picks_engine() {
    let values = vec![vec![100, 50], vec![90, 60]];
    let best = vec![0, 1];

    assert_eq!(
        PricingRule::SecondPrice.engine().payments(&values, 2, &best),
        vec![90, 50]
    );
    assert_eq!(PricingRule::Vcg.engine().payments(&values, 2, &best), vec![30, 0]);
    assert_eq!(PricingRule::default(), PricingRule::SecondPrice);
    assert_eq!(PricingRule::Vcg.to_string(), "vcg");
}
