use serde::Serialize;
use xcrud::{Expr, ModifyOp, Result, Statement, Target, session::Pipeline};

use crate::flush;

#[derive(Serialize)]
struct Order<'a> {
    customer: &'a str,
    items: Vec<&'a str>,
    total: f64,
}

pub async fn main() -> Result<()> {
    let mut pipeline = Pipeline::new();
    let orders = Target::collection("shop", "orders");

    // Add

    let mut reply = {
        let mut stmt = Statement::insert(&mut pipeline, orders.clone());
        let order = Order { customer: "ana", items: vec!["lamp"], total: 25.5 };
        stmt.add_document(Expr::from_serialize(&order).expect("order serializes"))?;
        stmt.add_document_json(r#"{"customer": "ben", "items": [], "total": 0}"#)?;
        assert!(stmt.add_row((1,)).is_err());
        stmt.execute()?;
        stmt.take_reply().expect("add with documents is sent")
    };

    flush(&mut pipeline, 2);
    reply.wait().await?;

    // Find

    let mut reply = {
        let mut stmt = Statement::select(&mut pipeline, orders.clone());
        stmt.set_where("total >= :total AND $.items[0] IN ('lamp', 'desk')")?;
        stmt.add_order_by("customer")?;
        stmt.bind("total", 10)?;
        stmt.execute()?;
        stmt.take_reply().expect("find is sent")
    };

    flush(&mut pipeline, 0);
    reply.wait().await?;

    // Modify

    let mut reply = {
        let mut stmt = Statement::update(&mut pipeline, orders.clone());
        stmt.set_where("customer == 'ben'")?;
        stmt.modify(ModifyOp::ArrayAppend, "$.items", Some(Expr::value("desk")))?;
        stmt.modify(ModifyOp::Set, "$.total", Some(Expr::value(120)))?;
        stmt.modify(ModifyOp::Unset, "$.draft", None)?;
        stmt.execute()?;
        stmt.take_reply().expect("modify is sent")
    };

    flush(&mut pipeline, 1);
    reply.wait().await?;

    // Remove

    let mut reply = {
        let mut stmt = Statement::remove(&mut pipeline, orders);
        stmt.set_where("total == 0")?;
        stmt.execute()?;
        stmt.take_reply().expect("remove is sent")
    };

    flush(&mut pipeline, 0);
    reply.wait().await?;

    Ok(())
}
