use anyhow::Result;
use carrier_enrich::testing::*;
use carrier_enrich::*;

fn beijing_store() -> InMemoryStore {
    InMemoryStore::from_entries(vec![ReferenceEntry::new(
        "1300001",
        "Beijing",
        "Beijing",
        "China Mobile",
    )])
}

fn run(input: &[u8], store: &InMemoryStore, cfg: &EnrichConfig) -> Result<EnrichOutput> {
    Ok(enrich_table(input, store, cfg)?)
}

#[test]
fn lookup_hit_with_extra_columns_inserted_layout() -> Result<()> {
    let cfg = EnrichConfig {
        layout: ColumnLayout::Insert,
        ..EnrichConfig::default()
    };
    let out = run(b"phone,a,b\n13000012222,x,y\n", &beijing_store(), &cfg)?;
    assert_table_eq(
        &out.bytes,
        "phone,province,city,carrier,a,b\n13000012222,Beijing,Beijing,China Mobile,x,y\n",
    );
    Ok(())
}

#[test]
fn lookup_hit_replace_layout_drops_fields_one_to_three() -> Result<()> {
    let out = run(
        b"phone,a,b\n13000012222,x,y\n",
        &beijing_store(),
        &EnrichConfig::default(),
    )?;
    assert_table_eq(
        &out.bytes,
        "phone,province,city,carrier\n13000012222,Beijing,Beijing,China Mobile\n",
    );
    Ok(())
}

#[test]
fn short_subject_yields_empty_reference_fields() -> Result<()> {
    let out = run(b"phone,a\n12,x\n", &beijing_store(), &EnrichConfig::default())?;
    assert_eq!(String::from_utf8(out.bytes)?, "phone,province,city,carrier\n12,,,\n");
    assert_eq!(out.report.short_subjects, 1);

    let cfg = EnrichConfig {
        layout: ColumnLayout::Insert,
        ..EnrichConfig::default()
    };
    let out = run(b"phone,a\n12,x\n", &beijing_store(), &cfg)?;
    assert_eq!(
        String::from_utf8(out.bytes)?,
        "phone,province,city,carrier,a\n12,,,,x\n"
    );
    Ok(())
}

#[test]
fn malformed_row_is_dropped_and_order_kept() -> Result<()> {
    let input = TableBuilder::new(["phone", "seq"])
        .row(["13000012222", "0"])
        .raw_line(b"\xff\xfe\xfd,1")
        .row(["13000013333", "2"])
        .build();
    let cfg = EnrichConfig {
        layout: ColumnLayout::Insert,
        ..EnrichConfig::default()
    };
    let out = run(&input, &beijing_store(), &cfg)?;
    assert_table_eq(
        &out.bytes,
        "phone,province,city,carrier,seq\n\
         13000012222,Beijing,Beijing,China Mobile,0\n\
         13000013333,Beijing,Beijing,China Mobile,2\n",
    );
    assert_eq!(out.report.rows_read, 2);
    assert_eq!(out.report.rows_skipped, 1);
    Ok(())
}

#[test]
fn header_only_input_gives_header_only_output() -> Result<()> {
    let out = run(b"phone,a,b,c,d,e\n", &beijing_store(), &EnrichConfig::default())?;
    assert_eq!(
        String::from_utf8(out.bytes)?,
        "phone,province,city,carrier,d,e\n"
    );
    assert_eq!(out.report.rows_read, 0);
    Ok(())
}

#[test]
fn empty_reference_never_errors() -> Result<()> {
    let input = generated_table(200);
    let out = run(&input, &InMemoryStore::new(), &EnrichConfig::default())?;
    let rows = parse_table(&out.bytes);
    assert_eq!(rows.len(), 201);
    for row in &rows[1..] {
        assert_eq!(&row[1..4], &["", "", ""]);
    }
    assert_eq!(out.report.rows_matched, 0);
    Ok(())
}

#[test]
fn lookup_uses_the_first_seven_characters_only() -> Result<()> {
    let input = TableBuilder::new(["phone"])
        .row(["1300001"])
        .row(["13000019999999"])
        .row(["130000"])
        .row(["2300001"])
        .build();
    let out = run(&input, &beijing_store(), &EnrichConfig::default())?;
    assert_table_eq(
        &out.bytes,
        "phone,province,city,carrier\n\
         1300001,Beijing,Beijing,China Mobile\n\
         13000019999999,Beijing,Beijing,China Mobile\n\
         130000,,,\n\
         2300001,,,\n",
    );
    assert_eq!(out.report.rows_matched, 2);
    assert_eq!(out.report.rows_unmatched, 1);
    assert_eq!(out.report.short_subjects, 1);
    Ok(())
}

#[test]
fn columns_beyond_index_three_survive_unchanged() -> Result<()> {
    let input = TableBuilder::new(["phone", "old_p", "old_c", "old_i", "name", "memo"])
        .row(["15300001234", "p", "c", "i", "Zhang, San", "say \"hi\""])
        .row(["18607551234", "p", "c", "i", "Li Si"])
        .build();
    let out = run(&input, &sample_store(), &EnrichConfig::default())?;
    let rows = parse_table(&out.bytes);
    assert_eq!(rows[0], vec!["phone", "province", "city", "carrier", "name", "memo"]);
    assert_eq!(
        rows[1],
        vec!["15300001234", "Shanghai", "Shanghai", "China Telecom", "Zhang, San", "say \"hi\""]
    );
    assert_eq!(
        rows[2],
        vec!["18607551234", "Guangdong", "Guangzhou", "China Unicom", "Li Si"]
    );
    Ok(())
}

#[test]
fn strict_columns_skips_ragged_rows() -> Result<()> {
    let input = b"phone,a\n13000012222,x\n13000012222\n13000012222,y\n";
    let cfg = EnrichConfig {
        strict_columns: true,
        layout: ColumnLayout::Insert,
        ..EnrichConfig::default()
    };
    let out = run(input, &beijing_store(), &cfg)?;
    let rows = parse_table(&out.bytes);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2][4], "y");
    assert_eq!(out.report.rows_skipped, 1);
    Ok(())
}

#[test]
fn custom_labels_and_delimiter() -> Result<()> {
    let cfg = EnrichConfig {
        delimiter: ';',
        labels: HeaderLabels {
            subject: "手机号".into(),
            province: "省份".into(),
            city: "城市".into(),
            carrier: "运营商".into(),
        },
        ..EnrichConfig::default()
    };
    let out = run(b"tel;a;b;c;x\n13000012222;1;2;3;4\n", &beijing_store(), &cfg)?;
    assert_eq!(
        String::from_utf8(out.bytes)?,
        "手机号;省份;城市;运营商;x\n13000012222;Beijing;Beijing;China Mobile;4\n"
    );
    Ok(())
}

#[test]
fn empty_input_is_a_format_error() {
    let err = enrich_table(b"", &beijing_store(), &EnrichConfig::default()).unwrap_err();
    assert!(matches!(err, EnrichError::Format(FormatError::MissingHeader)));
}

#[test]
fn unreadable_header_is_a_format_error() {
    let err = enrich_table(b"\xff\xfe,phone\n1,2\n", &beijing_store(), &EnrichConfig::default())
        .unwrap_err();
    assert!(matches!(err, EnrichError::Format(FormatError::Header(_))));
}

#[test]
fn soft_deleted_entries_do_not_match() -> Result<()> {
    let store = sample_store();
    assert!(store.soft_delete("1300001"));
    let out = run(b"phone\n13000012222\n13000022222\n", &store, &EnrichConfig::default())?;
    assert_table_eq(
        &out.bytes,
        "phone,province,city,carrier\n13000012222,,,\n13000022222,Tianjin,Tianjin,China Unicom\n",
    );
    Ok(())
}
