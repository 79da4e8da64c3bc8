//! Unit tests for core types, parameters, and error classification.

use hakken::merge::normalize_title;
use hakken::prelude::*;
use hakken::types::SearchParamsBuilder;

mod common;
use common::{episode, result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_ordering_and_heights() {
        assert!(Quality::Q2160 > Quality::Q1440);
        assert!(Quality::Q1080 > Quality::Q480);
        assert_eq!(Quality::Q480.height(), 480);
        assert_eq!(Quality::Q2160.height(), 2160);

        let mut tiers = vec![Quality::Q1080, Quality::Q480, Quality::Q720];
        tiers.sort();
        assert_eq!(tiers, vec![Quality::Q480, Quality::Q720, Quality::Q1080]);
    }

    #[test]
    fn test_quality_from_height_maps_to_tier() {
        assert_eq!(Quality::from_height(360), Quality::Q480);
        assert_eq!(Quality::from_height(480), Quality::Q480);
        assert_eq!(Quality::from_height(719), Quality::Q720);
        assert_eq!(Quality::from_height(1080), Quality::Q1080);
        assert_eq!(Quality::from_height(4000), Quality::Q2160);
    }

    #[test]
    fn test_quality_parse_and_display() {
        assert_eq!("1080p".parse::<Quality>().unwrap(), Quality::Q1080);
        assert_eq!("720".parse::<Quality>().unwrap(), Quality::Q720);
        assert_eq!(Quality::Q1440.to_string(), "1440p");
        assert!("potato".parse::<Quality>().is_err());
    }

    #[test]
    fn test_search_params_builder() {
        let params = SearchParamsBuilder::default()
            .query("frieren".to_string())
            .limit(Some(10))
            .sort_by(Some(SortKey::Year))
            .min_rating(Some(7.5f32))
            .build()
            .unwrap();

        assert_eq!(params.query, "frieren");
        assert_eq!(params.limit, Some(10));
        assert!(matches!(params.sort_by, Some(SortKey::Year)));
        assert_eq!(params.min_rating, Some(7.5));
        assert!(params.source.is_none());
    }

    #[test]
    fn test_search_params_from_str() {
        let params: SearchParams = "mushishi".into();
        assert_eq!(params.query, "mushishi");
        assert!(params.limit.is_none());

        let params: SearchParams = "mononoke".to_string().into();
        assert_eq!(params.query, "mononoke");
    }

    #[test]
    fn test_episode_helpers() {
        let mut ep = episode(7, "test");
        assert_eq!(ep.best_quality(), Some(Quality::Q1080));
        assert!(ep.has_quality(Quality::Q720));
        assert!(!ep.has_quality(Quality::Q2160));
        assert_eq!(ep.duration_seconds(), Some(24 * 60));

        ep.duration = Some("1:02:30".to_string());
        assert_eq!(ep.duration_seconds(), Some(3750));

        ep.duration = Some("garbage".to_string());
        assert_eq!(ep.duration_seconds(), None);

        ep.qualities.clear();
        assert_eq!(ep.best_quality(), None);
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            Error::transient("x", "boom").kind(),
            FailureKind::Transient
        );
        assert_eq!(
            Error::permanent("x", "gone").kind(),
            FailureKind::Permanent
        );
        assert_eq!(Error::rate_limit(Some(30)).kind(), FailureKind::Transient);
        assert_eq!(
            Error::Timeout(std::time::Duration::from_secs(1)).kind(),
            FailureKind::Transient
        );
        assert_eq!(Error::parse("bad html").kind(), FailureKind::Permanent);
        assert_eq!(Error::not_found("nothing").kind(), FailureKind::Permanent);

        // Unclassified errors fail fast rather than retry-storm.
        assert_eq!(
            Error::Other("mystery".to_string()).kind(),
            FailureKind::Permanent
        );
        assert_eq!(Error::Cancelled.kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_error_display_carries_context() {
        let error = Error::permanent("hianime", "page removed");
        let rendered = format!("{}", error);
        assert!(rendered.contains("hianime"));
        assert!(rendered.contains("page removed"));

        let error = Error::registration("animetsu", "invalid api_url");
        assert!(format!("{}", error).contains("failed to register"));
    }

    #[test]
    fn test_normalize_title_examples() {
        assert_eq!(normalize_title("Fullmetal Alchemist: Brotherhood"),
            "fullmetal alchemist brotherhood");
        assert_eq!(normalize_title("FULLMETAL   ALCHEMIST"), "fullmetal alchemist");
        assert_eq!(normalize_title("K-On!!"), "k on");
    }

    #[test]
    fn test_result_serde_round_trip() {
        let mut original = result("Serial Experiments Lain", "test");
        original.rating = Some(8.4);
        original.year = Some(1998);

        let json = serde_json::to_string(&original).unwrap();
        let back: SearchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.title, original.title);
        assert_eq!(back.year, Some(1998));
    }

    #[test]
    fn test_quality_serde_uses_labels() {
        let json = serde_json::to_string(&Quality::Q720).unwrap();
        assert_eq!(json, "\"720p\"");
        let back: Quality = serde_json::from_str("\"2160p\"").unwrap();
        assert_eq!(back, Quality::Q2160);
    }
}
