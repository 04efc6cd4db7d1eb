use pgcast::{Interval, Result, Value, array, hstore, record::{self, RecordCasts}};

pub fn main() -> Result<()> {
    let int: array::ElementCast<'_> = &pgcast::cast::cast_int;

    let matrix = array::parse("[0:1][0:1]={{1,2},{3,4}}", None, Some(int))?;
    assert_eq!(Value::Array(matrix.clone()).to_inline(), "ARRAY[[1,2],[3,4]]");
    println!("matrix: {}", array::format(&matrix, ','));

    let fields = record::parse(r#"("fuzzy dice",42,)"#, RecordCasts::Fields(&[None, Some(int), None]), None)?;
    assert_eq!(fields[1], Value::Int(42));
    assert!(fields[2].is_null());
    println!("record: {}", record::format(&fields, ','));

    let map = hstore::parse(r#"k => v, "a b" => NULL"#)?;
    println!("hstore: {}", hstore::format(&map));

    for text in ["1 year 2 mons 3 days", "@ 1 year 2 mons 3 days", "P1Y2M3D", "+1-2 +3"] {
        let interval = Interval::parse(text)?;
        println!("interval {text:?}: {interval} ({} days)", interval.total_days());
    }

    Ok(())
}
