use pgcast::{Cast, DateStyle, FromRecord, Result, Session, Value};
use time::macros::date;

use crate::catalog::Memory;

#[derive(Debug, FromRecord)]
struct InventoryItem {
    name: String,
    supplier_id: i32,
    price: Option<String>,
}

#[derive(Debug, FromRecord)]
struct OnHand(InventoryItem, i32);

pub fn main() -> Result<()> {
    let mut session = Session::new(Memory::new());

    let item: InventoryItem = session
        .typecast(Some(r#"("fuzzy dice",42,1.99)"#), "inventory_item")?
        .decode()?;
    println!("{item:?}");

    let on_hand: OnHand = session
        .typecast(Some(r#"("(""fuzzy dice"",42,1.99)",1000)"#), "on_hand")?
        .decode()?;
    println!("{on_hand:?}");

    let items: Vec<InventoryItem> = session
        .typecast(Some(r#"{"(a,1,)","(b,2,0.5)"}"#), "_inventory_item")?
        .decode()?;
    println!("{items:?}");

    let row = session.decode_row(&[Some("t"), Some("{1,2,3}"), None], &[16, 1007, 25])?;
    println!("{row:?}");

    session.catalog_mut().date_style = DateStyle::German;
    let day = session.typecast(Some("17.12.1997"), "date")?;
    assert_eq!(day, Value::Date(date!(1997-12-17)));

    session.set_typecast(&["int4"], Some(Cast::plain(|text| Ok(Value::Text(format!("#{text}"))))));
    println!("overridden: {:?}", session.typecast(Some("{1,2}"), "_int4")?);
    session.reset_typecast(None);
    println!("restored: {:?}", session.typecast(Some("{1,2}"), "_int4")?);

    Ok(())
}
