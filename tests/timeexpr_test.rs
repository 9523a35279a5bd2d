// Time expression parsing and interval combination tests

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use nest_timelapse::timeexpr::{
    make_interval_at, parse_duration, parse_interval, parse_speedup, parse_timestamp,
    parse_timestamp_at, TimeExprError, TimeInterval,
};

fn utc(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 20, h, m, 0).unwrap()
}

fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .earliest()
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn test_interval_all_eight_combinations() {
    let now = utc(12, 0);
    let start = Some(utc(10, 0));
    let end = Some(utc(11, 0));
    let hour = Some(Duration::hours(1));

    assert_eq!(
        make_interval_at(start, end, hour, now),
        Err(TimeExprError::OverdeterminedInterval)
    );

    let cases = [
        ((start, end, None), (utc(10, 0), utc(11, 0))),
        ((start, None, hour), (utc(10, 0), utc(11, 0))),
        ((None, end, hour), (utc(10, 0), utc(11, 0))),
        ((None, None, hour), (utc(11, 0), utc(12, 0))),
        ((start, None, None), (utc(10, 0), utc(12, 0))),
    ];
    for ((s, e, d), (want_start, want_end)) in cases {
        let interval = make_interval_at(s, e, d, now).unwrap();
        assert_eq!(interval.start(), want_start, "start for {:?}", (s, e, d));
        assert_eq!(interval.end(), want_end, "end for {:?}", (s, e, d));
    }

    let until_end = make_interval_at(None, end, None, now).unwrap();
    assert!(until_end.has_open_start());
    assert_eq!(until_end.start(), DateTime::<Utc>::MIN_UTC);
    assert_eq!(until_end.end(), utc(11, 0));

    let everything = make_interval_at(None, None, None, now).unwrap();
    assert!(everything.has_open_start());
    assert_eq!(everything.end(), now);
}

#[test]
fn test_inverted_interval() {
    let err = make_interval_at(Some(utc(10, 0)), Some(utc(9, 0)), None, utc(12, 0)).unwrap_err();
    assert_eq!(
        err,
        TimeExprError::InvertedInterval {
            start: utc(10, 0),
            end: utc(9, 0)
        }
    );
    assert!(TimeInterval::new(utc(10, 0), utc(9, 0)).is_err());

    // A start in the future with no end closes at "now"
    assert!(matches!(
        make_interval_at(Some(utc(13, 0)), None, None, utc(12, 0)),
        Err(TimeExprError::InvertedInterval { .. })
    ));
}

#[test]
fn test_duration_parsing() {
    assert_eq!(
        parse_duration("1d6h30m").unwrap(),
        Some(Duration::days(1) + Duration::hours(6) + Duration::minutes(30))
    );
    assert_eq!(parse_duration("2w").unwrap(), Some(Duration::weeks(2)));
    assert_eq!(parse_duration("0m").unwrap(), Some(Duration::zero()));
    assert_eq!(parse_duration("").unwrap(), None);

    for bad in ["1.5h", "45", "h", "1x", "-1h", "1h 30m"] {
        assert!(
            matches!(parse_duration(bad), Err(TimeExprError::MalformedDuration { .. })),
            "{:?} should be rejected",
            bad
        );
    }
}

#[test]
fn test_timestamp_separators_are_equivalent() {
    let expected = local(2024, 3, 20, 14, 30);
    for input in ["2024-03-20_14:30", "2024-03-20 14:30", "2024-03-20...14:30"] {
        assert_eq!(parse_timestamp(input).unwrap(), Some(expected), "{}", input);
    }
}

#[test]
fn test_timestamp_forms() {
    let now = Local.with_ymd_and_hms(2024, 3, 20, 18, 0, 0).earliest().unwrap();

    assert_eq!(parse_timestamp_at("", now).unwrap(), None);
    assert_eq!(
        parse_timestamp_at("14:30", now).unwrap(),
        Some(local(2024, 3, 20, 14, 30))
    );
    assert_eq!(
        parse_timestamp_at("2024-01-05", now).unwrap(),
        Some(local(2024, 1, 5, 0, 0))
    );
}

#[test]
fn test_timestamp_rejections() {
    match parse_timestamp("14:30:45") {
        Err(TimeExprError::MalformedTimestamp { input, .. }) => assert_eq!(input, "14:30:45"),
        other => panic!("unexpected: {:?}", other),
    }
    for bad in ["2024-13-01", "2024-03-20 25:00", "yesterday", "2024-03-20 14:30 extra", "..."] {
        assert!(parse_timestamp(bad).is_err(), "{:?} should be rejected", bad);
    }
}

#[test]
fn test_errors_name_the_input() {
    let err = parse_duration("3q").unwrap_err();
    assert!(err.to_string().contains("'3q'"));

    let err = parse_interval("2024-03-20 10:00", "bogus", "").unwrap_err();
    assert!(err.to_string().contains("bogus"));
}

#[test]
fn test_speedup_ratios() {
    assert_eq!(parse_speedup("1h/1s").unwrap().value(), 3600.0);
    assert_eq!(parse_speedup("1d/30s").unwrap().value(), 2880.0);
    assert_eq!(parse_speedup("30s/1s").unwrap().value(), 30.0);
    assert_eq!(parse_speedup("2.5").unwrap().value(), 2.5);
    assert!(parse_speedup("1h/0s").is_err());
    assert!(parse_speedup("1.5h/1s").is_err());
}

#[test]
fn test_no_flags_bound_at_now() {
    let before = Utc::now();
    let interval = parse_interval("", "", "").unwrap();
    assert!(interval.has_open_start());
    assert!(interval.end() >= before);
    assert!(interval.end() <= Utc::now());
    assert!(interval.contains(before - chrono::Duration::days(365)));
    assert!(!interval.contains(Utc::now() + chrono::Duration::hours(1)));
}
