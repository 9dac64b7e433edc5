use crate::{
    auction::{AdjustmentSplit, NonBidderContribution, PricingRule},
    config::{Config, ConfigError, ContributionRule},
};
use figment::Jail;
use std::time::{Duration, SystemTime};

#[test]
fn defaults_without_environment() {
    Jail::expect_with(|_jail| {
        let config = Config::get()?;
        assert_eq!(config.positions, 5);
        assert_eq!(config.pricing_rule, PricingRule::SecondPrice);
        assert_eq!(config.non_bidder_contribution, ContributionRule::HalfOfLowestPayment);
        assert_eq!(config.tie_break_seed, None);

        let rules = config.rules().expect("default rules");
        assert_eq!(rules.target_total, 327_500);
        assert_eq!(rules.adjustment_split, AdjustmentSplit::PerParticipant);
        assert_eq!(rules.max_tie_candidates, 10_000);
        assert_eq!(rules.fallback_room, "Bedroom 6");
        assert!(rules.position_labels.is_empty());
        assert_eq!(config.deadline().expect("no deadline"), None);
        assert_eq!(
            config.listen_addr().expect("listen address").port(),
            3000
        );
        Ok(())
    });
}

#[test]
fn reads_prefixed_environment() {
    Jail::expect_with(|jail| {
        jail.set_env("ROOM_AUCTION_TARGET_TOTAL", "3000.50");
        jail.set_env("ROOM_AUCTION_POSITIONS", "4");
        jail.set_env("ROOM_AUCTION_PRICING_RULE", "vcg");
        jail.set_env("ROOM_AUCTION_NON_BIDDER_CONTRIBUTION", "fixed");
        jail.set_env("ROOM_AUCTION_NON_BIDDER_FIXED_AMOUNT", "40");
        jail.set_env("ROOM_AUCTION_ADJUSTMENT_SPLIT", "per_head");
        jail.set_env("ROOM_AUCTION_MAX_BID", "$2,000");
        jail.set_env("ROOM_AUCTION_TIE_BREAK_SEED", "7");
        jail.set_env("ROOM_AUCTION_DEADLINE", "2026-11-01T12:00:00Z");
        jail.set_env("ROOM_AUCTION_LISTEN_ADDR", "127.0.0.1:8080");

        let config = Config::get()?;
        assert_eq!(config.tie_break_seed, Some(7));

        let rules = config.rules().expect("valid rules");
        assert_eq!(rules.target_total, 300_050);
        assert_eq!(rules.positions, 4);
        assert_eq!(rules.pricing_rule, PricingRule::Vcg);
        assert_eq!(rules.non_bidder_contribution, NonBidderContribution::Fixed(4_000));
        assert_eq!(rules.adjustment_split, AdjustmentSplit::PerHead);
        assert_eq!(rules.max_bid, Some(200_000));

        assert_eq!(
            config.deadline().expect("valid deadline"),
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_793_534_400))
        );
        assert_eq!(
            config.listen_addr().expect("listen address").to_string(),
            "127.0.0.1:8080"
        );
        Ok(())
    });
}

#[test]
fn rejects_inconsistent_settings() {
    Jail::expect_with(|jail| {
        jail.set_env("ROOM_AUCTION_NON_BIDDER_CONTRIBUTION", "fixed");
        assert!(matches!(
            Config::get()?.rules(),
            Err(ConfigError::MissingFixedAmount)
        ));

        jail.set_env("ROOM_AUCTION_NON_BIDDER_CONTRIBUTION", "half_of_lowest_payment");
        jail.set_env("ROOM_AUCTION_POSITIONS", "0");
        assert!(matches!(Config::get()?.rules(), Err(ConfigError::NoPositions)));

        jail.set_env("ROOM_AUCTION_POSITIONS", "5");
        jail.set_env("ROOM_AUCTION_TARGET_TOTAL", "12.345");
        assert!(matches!(
            Config::get()?.rules(),
            Err(ConfigError::Amount {
                field: "target_total",
                ..
            })
        ));

        jail.set_env("ROOM_AUCTION_TARGET_TOTAL", "100");
        jail.set_env("ROOM_AUCTION_DEADLINE", "next tuesday");
        assert!(matches!(
            Config::get()?.deadline(),
            Err(ConfigError::Deadline { .. })
        ));
        Ok(())
    });
}

#[test]
fn unknown_keys_are_errors() {
    Jail::expect_with(|jail| {
        jail.set_env("ROOM_AUCTION_PRICE_RULE", "vcg");
        assert!(Config::get().is_err());
        Ok(())
    });
}

#[test]
fn position_labels_match_positions() {
    Jail::expect_with(|jail| {
        jail.set_env("ROOM_AUCTION_POSITIONS", "2");
        jail.set_env(
            "ROOM_AUCTION_POSITION_LABELS",
            r#"["Room A - Ocean View Master", "Room B - Cozy Brick Loft"]"#,
        );
        let rules = Config::get()?.rules().expect("labels for both positions");
        assert_eq!(
            rules.position_labels,
            vec!["Room A - Ocean View Master", "Room B - Cozy Brick Loft"]
        );

        jail.set_env("ROOM_AUCTION_POSITIONS", "3");
        assert!(matches!(
            Config::get()?.rules(),
            Err(ConfigError::PositionLabels {
                labels: 2,
                positions: 3
            })
        ));
        Ok(())
    });
}
