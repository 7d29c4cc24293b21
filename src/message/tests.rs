use crate::error::CodecError;
use crate::message::{to_json_string, Registry};
use crate::schema::{ConstValue, FieldType, Schema, SchemaBuilder};

/// Car-style fixture: fixed scalars, enum, set, char array, composite, a flat
/// group, a nested group and two raw fields.
fn car_schema() -> Schema {
    let mut b = SchemaBuilder::new(9, 2);
    b.add_message(1, "car")
        .unwrap()
        .add_field(1, "serial", FieldType::U64)
        .unwrap()
        .add_field(2, "modelYear", FieldType::U16)
        .unwrap()
        .add_enum_field(3, "available", FieldType::U8, &[(0, "no"), (1, "yes")])
        .unwrap()
        .add_set_field(4, "options", FieldType::U8, &[("sunroof", 0), ("sportsPack", 2)])
        .unwrap()
        .add_array_field(5, "vehicleCode", FieldType::Char, 6)
        .unwrap()
        .add_constant(6, "make", ConstValue::Str("Ronda".into()))
        .unwrap()
        .begin_composite(7, "engine")
        .unwrap()
        .add_field(8, "capacity", FieldType::U16)
        .unwrap()
        .add_field(9, "numCylinders", FieldType::U8)
        .unwrap()
        .end_composite()
        .unwrap()
        .begin_group(10, "fuelFigures")
        .unwrap()
        .add_field(11, "speed", FieldType::U16)
        .unwrap()
        .add_field(12, "mpg", FieldType::Float)
        .unwrap()
        .end_group()
        .unwrap()
        .begin_group(13, "performanceFigures")
        .unwrap()
        .add_field(14, "octaneRating", FieldType::U8)
        .unwrap()
        .begin_group(15, "acceleration")
        .unwrap()
        .add_field(16, "mph", FieldType::U16)
        .unwrap()
        .add_field(17, "seconds", FieldType::Float)
        .unwrap()
        .end_group()
        .unwrap()
        .end_group()
        .unwrap()
        .add_raw_field(18, "manufacturer")
        .unwrap()
        .add_raw_field(19, "notes")
        .unwrap()
        .end_message()
        .unwrap();
    b.build().unwrap()
}

fn registry() -> Registry {
    Registry::new(car_schema())
}

#[test]
fn create_frames_an_empty_message() {
    let reg = registry();
    let mut buf = Vec::new();
    let msg = reg.create(1, &mut buf, 0).unwrap().unwrap();

    let serial = msg.field("serial").unwrap();
    assert_eq!(msg.get_u64(serial).unwrap(), 0);

    let fuel = msg.field("fuelFigures").unwrap();
    assert_eq!(msg.group_array(fuel).unwrap().num_groups().unwrap(), 0);

    let man = msg.field("manufacturer").unwrap();
    assert_eq!(msg.get_raw_len(man).unwrap(), 0);

    // header + fixed block + two group headers + two var headers
    let fixed = reg.schema().group(reg.schema().template(1).unwrap()).fixed_size();
    assert_eq!(buf.len(), 8 + fixed + 2 * 4 + 2 * 2);
    assert_eq!(reg.encoded_len(&buf, 0).unwrap(), buf.len());
}

#[test]
fn create_with_unknown_template_is_none() {
    let reg = registry();
    let mut buf = Vec::new();
    assert!(reg.create(42, &mut buf, 0).unwrap().is_none());
    assert!(buf.is_empty());
}

#[test]
fn wrap_rejects_foreign_schema_and_template_without_error() {
    let reg = registry();
    let mut buf = Vec::new();
    reg.create(1, &mut buf, 0).unwrap().unwrap();

    // template id control sits after blockLength in the default header
    buf[2] = 42;
    assert!(reg.wrap(&buf, 0).unwrap().is_none());
    buf[2] = 1;
    buf[4] = 77; // schema id
    assert!(reg.wrap(&buf, 0).unwrap().is_none());
    buf[4] = 9;
    assert!(reg.wrap(&buf, 0).unwrap().is_some());
}

#[test]
fn wrap_on_short_buffer_is_truncated() {
    let reg = registry();
    let buf = vec![0u8; 5];
    let err = reg.wrap(&buf, 0).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CodecError>(),
        Some(CodecError::TruncatedBuffer { .. })
    ));
}

#[test]
fn fixed_scalars_roundtrip_with_widening_reads() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();

    let serial = msg.field("serial").unwrap();
    let year = msg.field("modelYear").unwrap();
    msg.set_u64(serial, 1_234_567).unwrap();
    msg.set_u16(year, 2024).unwrap();

    assert_eq!(msg.get_u64(serial).unwrap(), 1_234_567);
    assert_eq!(msg.get_u16(year).unwrap(), 2024);
    // widening read of a narrower field is fine
    assert_eq!(msg.get_u64(year).unwrap(), 2024);

    // narrowing read is a type mismatch in safe mode
    let err = msg.get_u8(year).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CodecError>(),
        Some(CodecError::TypeMismatch { .. })
    ));
}

#[test]
fn narrow_write_value_must_fit() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let year = msg.field("modelYear").unwrap();
    let err = msg.set_u64(year, 70_000).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CodecError>(),
        Some(CodecError::TypeMismatch { .. })
    ));
    // buffer untouched by the failed write
    assert_eq!(msg.get_u16(year).unwrap(), 0);
}

#[test]
fn unsafe_mode_permits_narrowing_reads() {
    let reg = Registry::with_safe_mode(car_schema(), false);
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let year = msg.field("modelYear").unwrap();
    msg.set_u16(year, 0x0102).unwrap();
    // truncate-cast semantics: low byte in little-endian order
    assert_eq!(msg.get_u8(year).unwrap(), 0x02);
}

#[test]
fn unknown_field_is_always_checked() {
    let reg = Registry::with_safe_mode(car_schema(), false);
    let mut buf = Vec::new();
    let msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let err = msg.field("noSuchField").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CodecError>(),
        Some(CodecError::UnknownField { .. })
    ));
}

#[test]
fn foreign_field_handle_rejected_in_safe_mode() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let fuel = msg.field("fuelFigures").unwrap();
    let speed = {
        let mut rows = msg.group_array_mut(fuel).unwrap();
        let row = rows.add_group().unwrap();
        row.field("speed").unwrap()
    };
    // a row-level handle used against the message-level view
    let err = msg.get_u16(speed).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CodecError>(),
        Some(CodecError::UnknownField { .. })
    ));
}

#[test]
fn char_array_reads_as_trimmed_string() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let code = msg.field("vehicleCode").unwrap();
    msg.set_string(code, "ab12").unwrap();
    assert_eq!(msg.get_string(code).unwrap(), "ab12");
    // overlong strings never touch the buffer
    assert!(msg.set_string(code, "toolongcode").is_err());
    assert_eq!(msg.get_string(code).unwrap(), "ab12");
}

#[test]
fn constants_read_from_schema_and_reject_writes() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let make = msg.field("make").unwrap();
    assert_eq!(msg.as_view().get_string(make).unwrap(), "Ronda");
    let serial = msg.field("serial").unwrap();
    let size_before = msg.get_size().unwrap();
    assert!(msg.set_string(make, "X").is_err());
    assert_eq!(msg.get_size().unwrap(), size_before);
    // constant occupies no bytes: serial still starts the fixed block
    msg.set_u64(serial, 5).unwrap();
    assert_eq!(msg.get_u64(serial).unwrap(), 5);
}

#[test]
fn indexed_accessors_cover_signed_and_float_arrays() {
    let mut b = SchemaBuilder::new(2, 1);
    b.add_message(1, "m")
        .unwrap()
        .add_array_field(1, "deltas", FieldType::I16, 3)
        .unwrap()
        .add_array_field(2, "weights", FieldType::Double, 2)
        .unwrap()
        .end_message()
        .unwrap();
    let reg = Registry::new(b.build().unwrap());
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();

    let deltas = msg.field("deltas").unwrap();
    let weights = msg.field("weights").unwrap();
    msg.set_i16_at(deltas, 0, -7).unwrap();
    msg.set_i16_at(deltas, 2, 300).unwrap();
    msg.set_f64_at(weights, 1, 0.25).unwrap();

    assert_eq!(msg.get_i16_at(deltas, 0).unwrap(), -7);
    assert_eq!(msg.get_i16_at(deltas, 1).unwrap(), 0);
    assert_eq!(msg.get_i16_at(deltas, 2).unwrap(), 300);
    assert_eq!(msg.get_f64_at(weights, 1).unwrap(), 0.25);

    // element index checked on the write path too
    let err = msg.set_i16_at(deltas, 3, 0).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CodecError>(),
        Some(CodecError::IndexOutOfRange { index: 3, len: 3 })
    ));
}

#[test]
fn enum_roundtrip_with_unmapped_value() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let avail = msg.field("available").unwrap();
    msg.set_enum_value(avail, 1).unwrap();
    assert_eq!(msg.get_enum_name(avail).unwrap(), Some("yes"));
    msg.set_enum_value(avail, 9).unwrap();
    assert_eq!(msg.get_enum_name(avail).unwrap(), None);
    assert_eq!(msg.get_enum_value(avail).unwrap(), 9);
}

#[test]
fn set_choices_toggle_independently() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let opts = msg.field("options").unwrap();
    msg.set_choice(opts, "sunroof", true).unwrap();
    msg.set_choice(opts, "sportsPack", true).unwrap();
    msg.set_choice(opts, "sunroof", false).unwrap();
    assert!(!msg.get_choice(opts, "sunroof").unwrap());
    assert!(msg.get_choice(opts, "sportsPack").unwrap());
    assert!(msg.get_choice(opts, "heatedSeats").is_err());
}

#[test]
fn composite_members_access_transparently() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let engine = msg.field("engine").unwrap();
    let size_before = msg.get_size().unwrap();
    {
        let mut eng = msg.composite_mut(engine).unwrap();
        let cap = eng.field("capacity").unwrap();
        let cyl = eng.field("numCylinders").unwrap();
        eng.set_u16(cap, 2000).unwrap();
        eng.set_u8(cyl, 4).unwrap();
    }
    // composite writes never change encoded size
    assert_eq!(msg.get_size().unwrap(), size_before);
    let eng = msg.as_view().composite(engine).unwrap();
    assert_eq!(eng.get_u16(eng.field("capacity").unwrap()).unwrap(), 2000);
    assert_eq!(eng.get_u8(eng.field("numCylinders").unwrap()).unwrap(), 4);
}

#[test]
fn group_rows_add_read_delete() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let fuel = msg.field("fuelFigures").unwrap();
    let size_empty = msg.get_size().unwrap();

    for (speed, mpg) in [(30u16, 35.9f32), (55, 49.0), (75, 40.0)] {
        let mut rows = msg.group_array_mut(fuel).unwrap();
        let mut row = rows.add_group().unwrap();
        let s = row.field("speed").unwrap();
        let m = row.field("mpg").unwrap();
        row.set_u16(s, speed).unwrap();
        row.set_f32(m, mpg).unwrap();
    }

    // one row is 6 bytes of fixed block
    assert_eq!(msg.get_size().unwrap(), size_empty + 3 * 6);

    {
        let mut rows = msg.group_array_mut(fuel).unwrap();
        rows.delete_group(1).unwrap();
        assert_eq!(rows.num_groups().unwrap(), 2);
        let r0 = rows.group_at(0).unwrap();
        assert_eq!(r0.get_u16(r0.field("speed").unwrap()).unwrap(), 30);
        assert_eq!(r0.get_f32(r0.field("mpg").unwrap()).unwrap(), 35.9);
        let r1 = rows.group_at(1).unwrap();
        assert_eq!(r1.get_u16(r1.field("speed").unwrap()).unwrap(), 75);
        assert_eq!(r1.get_f32(r1.field("mpg").unwrap()).unwrap(), 40.0);
    }
    assert_eq!(msg.get_size().unwrap(), size_empty + 2 * 6);
}

#[test]
fn deleting_all_rows_restores_the_empty_encoding() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let fuel = msg.field("fuelFigures").unwrap();
    let size_empty = msg.get_size().unwrap();

    {
        let mut rows = msg.group_array_mut(fuel).unwrap();
        rows.add_group().unwrap();
        rows.add_group().unwrap();
        rows.delete_group(1).unwrap();
        rows.delete_group(0).unwrap();
        assert_eq!(rows.num_groups().unwrap(), 0);
    }
    assert_eq!(msg.get_size().unwrap(), size_empty);

    // and the group is usable again afterwards
    let mut rows = msg.group_array_mut(fuel).unwrap();
    rows.add_group().unwrap();
    assert_eq!(rows.num_groups().unwrap(), 1);
}

#[test]
fn occurrence_index_checked_in_every_mode() {
    for safe in [true, false] {
        let reg = Registry::with_safe_mode(car_schema(), safe);
        let mut buf = Vec::new();
        let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
        let fuel = msg.field("fuelFigures").unwrap();
        let mut rows = msg.group_array_mut(fuel).unwrap();
        rows.add_group().unwrap();
        let err = rows.group_at(1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CodecError>(),
            Some(CodecError::IndexOutOfRange { index: 1, len: 1 })
        ));
        let err = rows.delete_group(3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CodecError>(),
            Some(CodecError::IndexOutOfRange { index: 3, len: 1 })
        ));
    }
}

#[test]
fn nested_group_mutation_shifts_ancestors_consistently() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let perf = msg.field("performanceFigures").unwrap();
    let size_before = msg.get_size().unwrap();

    {
        let mut rows = msg.group_array_mut(perf).unwrap();
        let mut row = rows.add_group().unwrap();
        let octane = row.field("octaneRating").unwrap();
        row.set_u8(octane, 95).unwrap();
        let accel = row.field("acceleration").unwrap();
        let mut inner = row.group_array_mut(accel).unwrap();
        for (mph, secs) in [(30u16, 4.0f32), (60, 7.5)] {
            let mut r = inner.add_group().unwrap();
            let m = r.field("mph").unwrap();
            let s = r.field("seconds").unwrap();
            r.set_u16(m, mph).unwrap();
            r.set_f32(s, secs).unwrap();
        }
    }
    // outer row: 1 byte fixed + inner group header + 2 inner rows of 6 bytes
    assert_eq!(msg.get_size().unwrap(), size_before + 1 + 4 + 2 * 6);

    // raw fields after the groups are still addressable
    let man = msg.field("manufacturer").unwrap();
    msg.set_raw(man, b"Ronda Motors").unwrap();
    assert_eq!(msg.as_view().get_raw(man).unwrap(), b"Ronda Motors");

    // deleting the outer row removes its whole subtree
    {
        let mut rows = msg.group_array_mut(perf).unwrap();
        rows.delete_group(0).unwrap();
    }
    assert_eq!(msg.get_size().unwrap(), size_before + 12);
    assert_eq!(msg.as_view().get_raw(man).unwrap(), b"Ronda Motors");
}

#[test]
fn raw_resize_preserves_siblings() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let man = msg.field("manufacturer").unwrap();
    let notes = msg.field("notes").unwrap();

    msg.set_raw(man, b"Ronda").unwrap();
    msg.set_raw(notes, b"first note").unwrap();

    // grow the first payload: the second must relocate intact
    msg.set_raw(man, b"Ronda Heavy Industries").unwrap();
    assert_eq!(msg.as_view().get_raw(notes).unwrap(), b"first note");

    // shrink it: same guarantee
    msg.set_raw(man, b"R").unwrap();
    assert_eq!(msg.as_view().get_raw(man).unwrap(), b"R");
    assert_eq!(msg.as_view().get_raw(notes).unwrap(), b"first note");

    // same-length replace is a plain overwrite
    let size = msg.get_size().unwrap();
    msg.set_raw(man, b"X").unwrap();
    assert_eq!(msg.get_size().unwrap(), size);
}

#[test]
fn get_bytes_copies_at_most_dest_len() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let man = msg.field("manufacturer").unwrap();
    msg.set_raw(man, b"Ronda").unwrap();

    let mut small = [0u8; 3];
    assert_eq!(msg.get_bytes(man, &mut small).unwrap(), 3);
    assert_eq!(&small, b"Ron");

    let mut large = [0xFFu8; 16];
    assert_eq!(msg.get_bytes(man, &mut large).unwrap(), 5);
    assert_eq!(&large[..5], b"Ronda");
    assert_eq!(large[5], 0xFF);
}

#[test]
fn rewrap_after_mutations_reads_identical_values() {
    let reg = registry();
    let mut buf = Vec::new();
    {
        let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
        let serial = msg.field("serial").unwrap();
        msg.set_u64(serial, 99).unwrap();
        let fuel = msg.field("fuelFigures").unwrap();
        let mut rows = msg.group_array_mut(fuel).unwrap();
        let mut row = rows.add_group().unwrap();
        let s = row.field("speed").unwrap();
        row.set_u16(s, 120).unwrap();
        let man = msg.field("manufacturer").unwrap();
        msg.set_raw(man, b"Ronda").unwrap();
    }
    let msg = reg.wrap(&buf, 0).unwrap().unwrap();
    assert_eq!(msg.get_u64(msg.field("serial").unwrap()).unwrap(), 99);
    let rows = msg.group_array(msg.field("fuelFigures").unwrap()).unwrap();
    let row = rows.group_at(0).unwrap();
    assert_eq!(row.get_u16(row.field("speed").unwrap()).unwrap(), 120);
    assert_eq!(msg.get_raw(msg.field("manufacturer").unwrap()).unwrap(), b"Ronda");
    assert_eq!(reg.encoded_len(&buf, 0).unwrap(), buf.len());
}

#[test]
fn message_at_nonzero_offset() {
    let reg = registry();
    let mut buf = vec![0xEE; 16];
    {
        let mut msg = reg.create(1, &mut buf, 16).unwrap().unwrap();
        let serial = msg.field("serial").unwrap();
        msg.set_u64(serial, 7).unwrap();
    }
    assert_eq!(&buf[..16], &[0xEE; 16]);
    let msg = reg.wrap(&buf, 16).unwrap().unwrap();
    assert_eq!(msg.get_u64(msg.field("serial").unwrap()).unwrap(), 7);
}

#[test]
fn render_reflects_live_state() {
    let reg = registry();
    let mut buf = Vec::new();
    let mut msg = reg.create(1, &mut buf, 0).unwrap().unwrap();
    let year = msg.field("modelYear").unwrap();
    msg.set_u16(year, 2024).unwrap();
    let avail = msg.field("available").unwrap();
    msg.set_enum_value(avail, 1).unwrap();
    let code = msg.field("vehicleCode").unwrap();
    msg.set_string(code, "ab12").unwrap();

    let json = to_json_string(&msg.as_view()).unwrap();
    assert!(json.contains("\"modelYear\":2024"));
    assert!(json.contains("\"available\":\"yes\""));
    assert!(json.contains("\"vehicleCode\":\"ab12\""));
    assert!(json.contains("\"make\":\"Ronda\""));
    // empty repeating groups render as null
    assert!(json.contains("\"fuelFigures\":null"));

    let fuel = msg.field("fuelFigures").unwrap();
    {
        let mut rows = msg.group_array_mut(fuel).unwrap();
        let mut row = rows.add_group().unwrap();
        let s = row.field("speed").unwrap();
        row.set_u16(s, 55).unwrap();
    }
    let json = to_json_string(&msg.as_view()).unwrap();
    assert!(json.contains("\"fuelFigures\":[{\"speed\":55"));
}
