use idcm_transit::{
    read_advance_long_string, read_advance_short_string, read_consume_pod, write_any,
    write_long_string, write_short_string,
};

#[test]
fn test_pod_little_endian() {
    let mut buffer = vec![];
    write_any(&mut buffer, &0x0102_0304u32);
    write_any(&mut buffer, &-2i64);
    assert_eq!(&buffer[0..4], &[4, 3, 2, 1]);

    let mut window = &buffer[..];
    assert_eq!(read_consume_pod::<u32>(&mut window).unwrap(), 0x0102_0304);
    assert_eq!(read_consume_pod::<i64>(&mut window).unwrap(), -2);
    assert!(window.is_empty());
}

#[test]
fn test_underrun_is_an_error() {
    let buffer = [1u8, 2, 3];
    let mut window = &buffer[..];
    assert!(read_consume_pod::<u32>(&mut window).is_err());
    // the window is left untouched on failure
    assert_eq!(window.len(), 3);
}

#[test]
fn test_strings() {
    let mut buffer = vec![];
    write_long_string(&mut buffer, "do_stuff").unwrap();
    write_short_string(&mut buffer, "msg_len").unwrap();
    assert_eq!(buffer.len(), 4 + 8 + 2 + 7);

    let mut window = &buffer[..];
    assert_eq!(read_advance_long_string(&mut window).unwrap(), "do_stuff");
    assert_eq!(read_advance_short_string(&mut window).unwrap(), "msg_len");
}

#[test]
fn test_short_string_too_long() {
    let mut buffer = vec![];
    let long = "x".repeat(usize::from(u16::MAX) + 1);
    assert!(write_short_string(&mut buffer, &long).is_err());
}
