use xcrud::{Result, Row, Statement, Target, session::Pipeline};

use crate::flush;

pub async fn main() -> Result<()> {
    let mut pipeline = Pipeline::new();
    let products = Target::table("shop", "products");

    // Insert

    let mut reply = {
        let mut stmt = Statement::insert(&mut pipeline, products.clone());
        stmt.add_columns(["id", "name", "price"])?;
        stmt.add_row((1, "Lamp", 25.5))?;
        stmt.add_row(Row::new().with(2).with("Desk").with(120.0))?;
        stmt.execute()?;
        stmt.take_reply().expect("insert with rows is sent")
    };

    flush(&mut pipeline, 2);
    assert_eq!(reply.wait().await?.affected_rows, 2);

    // Insert without rows is never sent

    let mut stmt = Statement::insert(&mut pipeline, products.clone());
    assert!(stmt.execute()?.is_none());
    drop(stmt);
    assert_eq!(pipeline.pending(), 0);

    // Select

    let mut reply = {
        let mut stmt = Statement::select(&mut pipeline, products.clone());
        stmt.add_projection("name")?;
        stmt.add_projection("price * 2 AS double_price")?;
        stmt.set_where("price > :min AND name LIKE :pattern")?;
        stmt.set_order_by(["price DESC", "name"])?;
        stmt.set_limit(10, 0)?;
        stmt.bind("min", 20)?;
        stmt.bind("pattern", "D%")?;
        stmt.execute()?;
        stmt.take_reply().expect("select is sent")
    };

    flush(&mut pipeline, 0);
    reply.wait().await?;

    // Update

    let mut reply = {
        let mut stmt = Statement::update(&mut pipeline, products.clone());
        stmt.set_value("price", 99.0)?;
        stmt.set_expr("name", "concat(name, ' (sale)')")?;
        stmt.set_where("id = :id")?;
        stmt.bind("id", 2)?;
        stmt.execute()?;
        stmt.take_reply().expect("update is sent")
    };

    flush(&mut pipeline, 1);
    assert_eq!(reply.wait().await?.affected_rows, 1);

    // Delete, then observe the server error

    let mut stmt = Statement::remove(&mut pipeline, products);
    stmt.set_where("price < 10")?;
    stmt.set_limit(5, 0)?;
    assert!(stmt.set_limit(5, 5).is_err());
    stmt.execute()?;

    let mut reply = stmt.take_reply().expect("delete is sent");
    let diagnostics = stmt.diagnostics()?;
    drop(stmt);

    let frames = pipeline.take_outgoing();
    println!("{} bytes: {}", frames.len(), frames.escape_ascii());
    pipeline.fail(xcrud::Diagnostic::error(1142, "DELETE command denied").with_sqlstate("42000"));

    assert!(diagnostics.is_empty());
    if let Err(err) = reply.wait().await {
        println!("{err}");
    }

    Ok(())
}
