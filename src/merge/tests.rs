#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use crate::capture::memory::{MemoryCapture, MemoryStore};
    use crate::capture::{
        CaptureFilter, Encapsulation, FormatRegistry, InterfaceDescriptor, OutputParams, ReadError, Record,
        RecordKind, SectionInfo, Timestamp,
    };
    use crate::merge::input::{InputFileSet, InputState};
    use crate::merge::writer::OutputWriter;
    use crate::merge::{
        is_duplicate, merge_interfaces, select_frame_type, DedupMode, MergeConfig, MergeError, MergeMode,
        MergeStatus, RecordScheduler,
    };

    fn eth(name: &str) -> InterfaceDescriptor {
        InterfaceDescriptor::new(Encapsulation::ETHERNET, 1, 65535).with_name(name)
    }

    fn packets_at(times: &[(i64, u32)]) -> Vec<Record> {
        times
            .iter()
            .map(|&(secs, nanos)| Record::packet(Timestamp::new(secs, nanos), 0, vec![0u8; 64]))
            .collect()
    }

    fn registry_for(store: &MemoryStore) -> FormatRegistry {
        let mut registry = FormatRegistry::new();
        registry.register(Arc::new(store.format()));
        registry
    }

    fn open_set(store: &MemoryStore, names: &[&str]) -> InputFileSet {
        let paths: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();
        InputFileSet::open(&paths, &registry_for(store)).unwrap()
    }

    fn drain(scheduler: &mut RecordScheduler, inputs: &mut InputFileSet) -> Vec<(usize, Record)> {
        let mut order = Vec::new();
        while let Some(next) = scheduler.next_record(inputs.files_mut()).unwrap() {
            order.push(next);
        }
        order
    }

    #[test]
    fn test_is_duplicate_reflexive_and_symmetric() {
        let a = eth("eth0");
        let mut b = eth("eth0");
        b.speed = Some(1_000_000_000);
        let mut c = eth("eth1");
        c.description = Some("uplink".to_string());

        for x in [&a, &b, &c] {
            assert!(is_duplicate(x, x));
            for y in [&a, &b, &c] {
                assert_eq!(is_duplicate(x, y), is_duplicate(y, x));
            }
        }
    }

    #[test]
    fn test_is_duplicate_optional_attributes() {
        let plain = InterfaceDescriptor::new(Encapsulation::ETHERNET, 1, 65535);
        let named = eth("eth0");
        let other_name = eth("eth1");

        // Present on one side only is not a mismatch.
        assert!(is_duplicate(&plain, &named));
        assert!(!is_duplicate(&named, &other_name));

        let mut fast = named.clone();
        fast.speed = Some(10_000_000_000);
        let mut slow = named.clone();
        slow.speed = Some(100_000_000);
        assert!(is_duplicate(&fast, &named));
        assert!(!is_duplicate(&fast, &slow));

        let mut commented = named.clone();
        commented.comment = Some("span port".to_string());
        commented.os = Some("Linux 6.1".to_string());
        assert!(is_duplicate(&commented, &named));
    }

    #[test]
    fn test_is_duplicate_mandatory_fields_and_ignored_fields() {
        let base = eth("eth0");

        let mut snaplen = base.clone();
        snaplen.snaplen = 96;
        assert!(!is_duplicate(&base, &snaplen));

        let mut link_type = base.clone();
        link_type.link_type = 105;
        assert!(!is_duplicate(&base, &link_type));

        let mut units = base.clone();
        units.time_units_per_second = 1_000_000_000;
        assert!(!is_duplicate(&base, &units));

        let mut filtered = base.clone();
        filtered.filter = Some(CaptureFilter::Expression("udp".to_string()));
        filtered.statistics.push(Default::default());
        assert!(is_duplicate(&base, &filtered));
    }

    #[test]
    fn test_dedup_none_keeps_every_interface() {
        let a = vec![eth("eth0"), eth("eth1")];
        let b = vec![eth("eth0")];
        let c = vec![eth("eth0"), eth("eth1"), eth("eth2")];
        let lists: Vec<&[InterfaceDescriptor]> = vec![&a, &b, &c];

        let merged = merge_interfaces(&lists, DedupMode::None);
        assert_eq!(merged.interfaces.len(), 6);
        assert_eq!(merged.maps, vec![vec![0, 1], vec![2], vec![3, 4, 5]]);
    }

    #[test]
    fn test_dedup_all_same_identical_lists() {
        let mut a0 = eth("eth0");
        a0.filter = Some(CaptureFilter::Expression("tcp".to_string()));
        let a = vec![a0, eth("eth1")];
        let b = vec![eth("eth0"), eth("eth1")];
        let lists: Vec<&[InterfaceDescriptor]> = vec![&a, &b, &b];

        let merged = merge_interfaces(&lists, DedupMode::AllSame);
        assert_eq!(merged.interfaces.len(), 2);
        assert!(merged.interfaces[0].filter.is_none());
        for map in &merged.maps {
            assert_eq!(map, &vec![0, 1]);
        }
    }

    #[test]
    fn test_dedup_all_same_falls_back_to_any() {
        let a = vec![eth("eth0"), eth("eth1")];
        let b = vec![eth("eth1"), eth("eth0")];
        let lists: Vec<&[InterfaceDescriptor]> = vec![&a, &b];

        let all = merge_interfaces(&lists, DedupMode::AllSame);
        let any = merge_interfaces(&lists, DedupMode::AnySame);
        assert_eq!(all.interfaces, any.interfaces);
        assert_eq!(all.maps, any.maps);
        assert_eq!(all.maps, vec![vec![0, 1], vec![1, 0]]);
    }

    #[test]
    fn test_dedup_any_same_bounds_and_same_file_matches() {
        let a = vec![eth("eth0"), eth("eth0"), eth("wlan0")];
        let b = vec![eth("wlan0"), eth("lo")];
        let lists: Vec<&[InterfaceDescriptor]> = vec![&a, &b];

        let merged = merge_interfaces(&lists, DedupMode::AnySame);
        assert_eq!(merged.maps, vec![vec![0, 0, 1], vec![1, 2]]);
        assert_eq!(merged.interfaces.len(), 3);
        assert!(merged.interfaces.len() <= lists.iter().map(|l| l.len()).sum());
    }

    #[test]
    fn test_dedup_any_same_collapses_repeats_within_one_file() {
        // A file listing the same interface three times contributes one merged
        // interface, so the merged count can fall below the longest list.
        let a = vec![eth("eth0"), eth("eth0"), eth("eth0")];
        let b = vec![eth("eth1")];
        let lists: Vec<&[InterfaceDescriptor]> = vec![&a, &b];

        let merged = merge_interfaces(&lists, DedupMode::AnySame);
        assert_eq!(merged.interfaces.len(), 2);
        assert_eq!(merged.maps, vec![vec![0, 0, 0], vec![1]]);

        let none = merge_interfaces(&lists, DedupMode::None);
        assert_eq!(none.interfaces.len(), 4);
    }

    #[test]
    fn test_frame_type_selection() {
        assert_eq!(
            select_frame_type(vec![Encapsulation::ETHERNET, Encapsulation::ETHERNET]),
            Encapsulation::ETHERNET
        );
        assert_eq!(
            select_frame_type(vec![Encapsulation(1), Encapsulation(2)]),
            Encapsulation::PER_RECORD
        );
        assert_eq!(select_frame_type(Vec::new()), Encapsulation::UNKNOWN);
    }

    #[test]
    fn test_chronological_ties_go_to_lower_index() {
        let store = MemoryStore::new();
        store.insert(
            "a.cap",
            MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")])
                .with_records(packets_at(&[(1, 0), (3, 0), (3, 0)])),
        );
        store.insert(
            "b.cap",
            MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")])
                .with_records(packets_at(&[(2, 0), (3, 0)])),
        );

        let mut inputs = open_set(&store, &["a.cap", "b.cap"]);
        let mut scheduler = RecordScheduler::new(MergeMode::Chronological);
        let order: Vec<usize> = drain(&mut scheduler, &mut inputs).into_iter().map(|(i, _)| i).collect();

        assert_eq!(order, vec![0, 1, 0, 0, 1]);
        assert!(inputs.files().iter().all(|f| f.state() == InputState::AtEof));
        assert_eq!(inputs.files()[0].record_num(), 3);
        assert_eq!(inputs.files()[1].record_num(), 2);
    }

    #[test]
    fn test_chronological_output_is_non_decreasing() {
        let store = MemoryStore::new();
        store.insert(
            "a.cap",
            MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")])
                .with_records(packets_at(&[(0, 100), (0, 900), (5, 0), (7, 1)])),
        );
        store.insert(
            "b.cap",
            MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")])
                .with_records(packets_at(&[(0, 500), (6, 0)])),
        );
        store.insert("c.cap", MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")]));

        let mut inputs = open_set(&store, &["a.cap", "b.cap", "c.cap"]);
        let mut scheduler = RecordScheduler::new(MergeMode::Chronological);
        let records = drain(&mut scheduler, &mut inputs);

        assert_eq!(records.len(), 6);
        assert!(records
            .windows(2)
            .all(|w| w[0].1.timestamp <= w[1].1.timestamp));
    }

    #[test]
    fn test_append_concatenates_in_input_order() {
        let store = MemoryStore::new();
        store.insert(
            "a.cap",
            MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")])
                .with_records(packets_at(&[(9, 0), (10, 0)])),
        );
        store.insert("empty.cap", MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")]));
        store.insert(
            "b.cap",
            MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")])
                .with_records(packets_at(&[(1, 0), (2, 0), (3, 0)])),
        );

        let mut inputs = open_set(&store, &["a.cap", "empty.cap", "b.cap"]);
        let mut scheduler = RecordScheduler::new(MergeMode::Append);
        let records = drain(&mut scheduler, &mut inputs);

        let order: Vec<(usize, i64)> = records.iter().map(|(i, r)| (*i, r.timestamp.secs)).collect();
        assert_eq!(order, vec![(0, 9), (0, 10), (2, 1), (2, 2), (2, 3)]);
        assert_eq!(inputs.files()[1].state(), InputState::AtEof);
    }

    #[test]
    fn test_read_error_stops_with_attribution() {
        let store = MemoryStore::new();
        store.insert(
            "a.cap",
            MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")])
                .with_records(packets_at(&[(1, 0), (2, 0)])),
        );
        let mut failing = MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")])
            .with_records(packets_at(&[(1, 5), (2, 5), (3, 5)]));
        failing.fail_read_after = Some(1);
        store.insert("b.cap", failing);

        let mut inputs = open_set(&store, &["a.cap", "b.cap"]);
        let mut scheduler = RecordScheduler::new(MergeMode::Chronological);

        assert_eq!(scheduler.next_record(inputs.files_mut()).unwrap().unwrap().0, 0);
        assert_eq!(scheduler.next_record(inputs.files_mut()).unwrap().unwrap().0, 1);
        let err = scheduler.next_record(inputs.files_mut()).unwrap_err();

        assert_eq!(err.status(), MergeStatus::CantReadInFile);
        assert_eq!(err.input_index(), Some(1));
        assert_eq!(err.record_num(), Some(2));
        assert_eq!(inputs.files()[1].state(), InputState::GotError);
        assert!(err.to_string().contains("record 2 of \"b.cap\""));
    }

    #[test]
    fn test_open_failure_closes_earlier_inputs() {
        let store = MemoryStore::new();
        store.insert("a.cap", MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")]));
        let paths = vec![PathBuf::from("a.cap"), PathBuf::from("missing.cap")];

        let err = match InputFileSet::open(&paths, &registry_for(&store)) {
            Err(e) => e,
            Ok(_) => panic!("opening a missing input should fail"),
        };

        assert_eq!(err.status(), MergeStatus::CantOpenInFile(1));
        assert!(matches!(
            err,
            MergeError::CantOpenInFile { source: ReadError::UnknownFormat, .. }
        ));
        assert_eq!(store.readers_opened(), 1);
        assert_eq!(store.open_readers(), 0);
    }

    #[test]
    fn test_output_writer_clamps_and_remaps() {
        let store = MemoryStore::new();
        let mut big = Record::packet(Timestamp::new(1, 0), 1, vec![7u8; 1500]);
        big.original_len = 1500;
        let mut event = Record::packet(Timestamp::new(2, 0), 0, vec![1, 2, 3]);
        event.kind = RecordKind::Event;
        event.interface_id = Some(42);
        store.insert(
            "a.cap",
            MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0"), eth("eth1")])
                .with_records(vec![big, event]),
        );

        let mut inputs = open_set(&store, &["a.cap"]);
        inputs.assign_interface_maps(vec![vec![4, 5]]);

        let section = SectionInfo::default();
        let params = OutputParams {
            encapsulation: Encapsulation::ETHERNET,
            snaplen: 100,
            section: &section,
            interfaces: &[],
        };
        let format = store.format();
        let destination = Path::new("out.cap");
        let mut writer = OutputWriter::open(&format, destination, &params, 100).unwrap();

        let mut scheduler = RecordScheduler::new(MergeMode::Append);
        while let Some((index, record)) = scheduler.next_record(inputs.files_mut()).unwrap() {
            writer.write(index, &inputs.files()[index], record).unwrap();
        }
        assert_eq!(writer.close().unwrap(), 2);

        let output = store.output(destination).unwrap();
        assert!(output.closed);
        assert_eq!(output.records[0].captured_len, 100);
        assert_eq!(output.records[0].original_len, 1500);
        assert_eq!(output.records[0].interface_id, Some(5));
        // Records without an interface reference pass through untouched.
        assert_eq!(output.records[1].interface_id, Some(42));
        assert_eq!(output.records[1].captured_len, 3);
    }

    #[test]
    fn test_output_writer_rejects_unknown_interface() {
        let store = MemoryStore::new();
        store.insert(
            "a.cap",
            MemoryCapture::new(Encapsulation::ETHERNET, vec![eth("eth0")])
                .with_records(vec![Record::packet(Timestamp::new(1, 0), 3, vec![0; 10])]),
        );

        let mut inputs = open_set(&store, &["a.cap"]);
        inputs.assign_interface_maps(vec![vec![0]]);

        let section = SectionInfo::default();
        let params = OutputParams {
            encapsulation: Encapsulation::ETHERNET,
            snaplen: 0,
            section: &section,
            interfaces: &[],
        };
        let format = store.format();
        let mut writer = OutputWriter::open(&format, Path::new("out.cap"), &params, 0).unwrap();

        let mut scheduler = RecordScheduler::new(MergeMode::Chronological);
        let (index, record) = scheduler.next_record(inputs.files_mut()).unwrap().unwrap();
        let err = writer.write(index, &inputs.files()[index], record).unwrap_err();

        assert_eq!(err.status(), MergeStatus::BadInterfaceId);
        assert_eq!(err.record_num(), Some(1));
        assert_eq!(
            err.to_string(),
            "Record 1 of \"a.cap\" has interface ID 3, which does not match any interface in its file."
        );
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let mut config = MergeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dedup_mode, DedupMode::AllSame);
        assert_eq!(config.merge_mode(), MergeMode::Chronological);

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"dedup_mode\":\"all\""));

        config.snaplen = 300_000;
        assert!(config.validate().is_err());

        config.snaplen = 100;
        config.progress_interval_records = 0;
        assert!(config.validate().is_err());

        config.progress_interval_records = 10;
        config.output_format = " ".to_string();
        assert!(config.validate().is_err());

        config.output_format = "pcap".to_string();
        config.do_append = true;
        assert!(config.validate().is_ok());
        assert_eq!(config.merge_mode(), MergeMode::Append);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("capmerge_config.json");

        let config = MergeConfig {
            dedup_mode: DedupMode::AnySame,
            snaplen: 128,
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        let loaded = MergeConfig::from_file(&path).unwrap();
        assert_eq!(loaded.dedup_mode, DedupMode::AnySame);
        assert_eq!(loaded.snaplen, 128);
        assert_eq!(loaded.output_format, config.output_format);
    }
}
