mod fixtures;

use fixtures::*;
use opxml::model::{
    CheckEventsResult, DaemonEvent, EventCheckStatus, ModelData, OpInfo, SessionList,
    UnitMaskKind,
};
use opxml::{CallData, DocumentKind, ErrorKind, OpxmlParser, ParserSettings, ProcessorRegistry};
use pretty_assertions::assert_eq;

#[test]
fn test_parses_info_sample() {
    ensure_env_logger_initialized();
    let info: OpInfo = match OpxmlParser::default().parse_file(info_sample()).unwrap() {
        CallData::Info(info) => info,
        other => panic!("expected info, got {:?}", other.kind()),
    };

    assert_eq!(info.num_counters, 4);
    assert_eq!(info.cpu_frequency, 2793.0);
    assert_eq!(
        info.defaults.dump_status.as_deref(),
        Some("/var/lib/oprofile/complete_dump")
    );
    assert_eq!(
        info.counters.iter().map(|c| c.counter).collect::<Vec<_>>(),
        vec![0, 1]
    );

    let llc = info.find_event(1, "LLC_MISSES").unwrap();
    assert_eq!(llc.unit_mask.kind, UnitMaskKind::Bitmask);
    assert_eq!(llc.unit_mask.default, 0x41);
}

#[test]
fn test_info_checks_events_locally() {
    ensure_env_logger_initialized();
    let info = OpxmlParser::default()
        .parse_as::<OpInfo, _>(std::fs::read(info_sample()).unwrap().as_slice())
        .unwrap();

    assert!(info.check_event(&DaemonEvent::new("CPU_CLK_UNHALTED", 100_000, 1)).valid);

    let missing = info.check_event(&DaemonEvent::new("NOT_AN_EVENT", 100_000, 0));
    assert!(!missing.valid);
    assert_eq!(missing.statuses, vec![EventCheckStatus::InvalidEvent]);

    let wrong_counter =
        info.check_event(&DaemonEvent::new("LLC_MISSES", 100_000, 0x41).on_counter(7));
    assert_eq!(wrong_counter.statuses, vec![EventCheckStatus::InvalidCounter]);
}

#[test]
fn test_parses_check_events_samples() {
    ensure_env_logger_initialized();
    let parser = OpxmlParser::default();

    let ok = parser
        .parse_as::<CheckEventsResult, _>(std::io::BufReader::new(
            std::fs::File::open(check_events_ok_sample()).unwrap(),
        ))
        .unwrap();
    assert!(ok.valid);

    let invalid = match parser.parse_file(check_events_invalid_sample()).unwrap() {
        CallData::CheckEvents(result) => result,
        other => panic!("expected check-events, got {:?}", other.kind()),
    };
    assert!(!invalid.valid);
    assert_eq!(
        invalid.statuses,
        vec![
            EventCheckStatus::InvalidUnitMask,
            EventCheckStatus::InvalidCounter
        ]
    );
    assert!(invalid.reason.is_some_and(|r| !r.is_empty()));
}

#[test]
fn test_parses_model_data_sample() {
    ensure_env_logger_initialized();
    let data = match OpxmlParser::default()
        .parse_file(model_data_sample())
        .unwrap()
    {
        CallData::ModelData(data) => data,
        other => panic!("expected model-data, got {:?}", other.kind()),
    };

    let hello = &data.images[0];
    assert_eq!(hello.name, "/usr/bin/hello");
    assert_eq!(
        hello.symbols.iter().map(|s| s.count).collect::<Vec<_>>(),
        vec![8, 4]
    );
    // Summed from the symbols, not the `count` attribute.
    assert_eq!(hello.count, 12);
    assert_eq!(hello.dependents[0].count, 7);
    assert_eq!(hello.dependents[1].count, 2);
    assert_eq!(hello.total_count(), 21);
    assert_eq!(data.total_count(), 61);
}

#[test]
fn test_parses_sessions_sample() {
    ensure_env_logger_initialized();
    let sessions = match OpxmlParser::default().parse_file(sessions_sample()).unwrap() {
        CallData::Sessions(sessions) => sessions,
        other => panic!("expected sessions, got {:?}", other.kind()),
    };

    assert_eq!(
        sessions.names().collect::<Vec<_>>(),
        vec!["current", "run-2009-06-02", "current"]
    );
    assert_eq!(sessions.by_event().len(), 2);
}

#[test]
fn test_truncated_document_is_malformed() {
    ensure_env_logger_initialized();
    let err = OpxmlParser::default()
        .parse_file(truncated_model_data_sample())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedDocument);
}

#[test]
fn test_unknown_root_tag_is_reported() {
    ensure_env_logger_initialized();
    let err = OpxmlParser::default()
        .parse_file(unknown_root_sample())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownRootTag);
    insta::assert_snapshot!(err.to_string(), @"No processor registered for root tag `daemon-status`");
}

#[test]
fn test_asking_for_the_wrong_document_fails() {
    ensure_env_logger_initialized();
    let err = OpxmlParser::default()
        .parse_as::<SessionList, _>(std::fs::read(info_sample()).unwrap().as_slice())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    insta::assert_snapshot!(err.to_string(), @"Expected a `sessions` document, found `info`");
}

#[test]
fn test_invalid_scalar_carries_its_offset() {
    ensure_env_logger_initialized();
    let xml = "<info><num-counters>four</num-counters></info>";
    let err = OpxmlParser::default().parse_str(xml).unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("Offset "), "{}", message);
    assert!(
        message.ends_with(": invalid value `four` for `num-counters`"),
        "{}",
        message
    );
}

#[test]
fn test_content_after_root_is_rejected() {
    ensure_env_logger_initialized();
    let err = OpxmlParser::default()
        .parse_str("<sessions/><sessions/>")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedDocument);
}

#[test]
fn test_text_outside_the_root_is_rejected() {
    ensure_env_logger_initialized();
    let parser = OpxmlParser::default();

    for xml in [
        "<sessions/><![CDATA[junk]]>",
        "<sessions/>junk",
        "junk<sessions/>",
        "<![CDATA[junk]]><sessions/>",
    ] {
        let err = parser.parse_str(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument, "{}", xml);
    }

    assert!(parser.parse_str("<?xml version=\"1.0\"?>\n<sessions/>\n").is_ok());
}

#[test]
fn test_empty_input_has_no_root() {
    let err = OpxmlParser::default().parse_str("").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDocument);
}

#[test]
fn test_entities_and_cdata_are_text() {
    let xml = "<sessions><session>a&amp;b</session><session><![CDATA[<c>]]></session></sessions>";
    let sessions = OpxmlParser::default()
        .parse_as::<SessionList, _>(xml.as_bytes())
        .unwrap();

    assert_eq!(sessions.names().collect::<Vec<_>>(), vec!["a&b", "<c>"]);
}

#[test]
fn test_restricted_registry_only_knows_its_tags() {
    let mut registry = ProcessorRegistry::new();
    registry
        .register(
            "sessions",
            DocumentKind::Sessions,
            opxml::processors::SessionsProcessor::boxed,
        )
        .unwrap();

    let parser = OpxmlParser::new(&registry);
    assert!(parser.parse_str("<sessions/>").is_ok());
    assert_eq!(
        parser.parse_str("<model-data/>").unwrap_err().kind(),
        ErrorKind::UnknownRootTag
    );
}

#[test]
fn test_strict_settings_reject_unknown_elements() {
    let xml = std::fs::read_to_string(model_data_sample())
        .unwrap()
        .replace("<symbols>", "<symbols><unexpected/>");

    assert!(OpxmlParser::default().parse_str(&xml).is_ok());
    let strict = OpxmlParser::default().with_configuration(ParserSettings::new().strict(true));
    assert_eq!(
        strict.parse_str(&xml).unwrap_err().kind(),
        ErrorKind::MalformedDocument
    );
}

#[test]
fn test_model_data_serializes_to_json() {
    let data = OpxmlParser::default()
        .parse_as::<ModelData, _>(
            r#"<model-data><image name="a"><symbol name="s" count="3"/></image></model-data>"#
                .as_bytes(),
        )
        .unwrap();

    let json = serde_json::to_value(&data).unwrap();
    assert_eq!(json["images"][0]["symbols"][0]["count"], 3);
    assert_eq!(json["images"][0]["count"], 3);
}
