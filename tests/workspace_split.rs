use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use typesplit::core::{Engine, Selector};
use typesplit::SplitError;

const ORDERS: &str = r#"using System;
using System.Collections.Generic;
using Acme.Shipping;

namespace Acme.Orders
{
    /// <summary>An order line.</summary>
    public class OrderLine
    {
        public Parcel Parcel { get; set; }
    }

    public class Order
    {
        public List<OrderLine> Lines { get; } = new List<OrderLine>();
        public DateTime Placed { get; set; }
    }
}
"#;

const SHIPPING: &str = r#"namespace Acme.Shipping
{
    public class Parcel { }
}
"#;

async fn engine(root: &TempDir) -> Engine {
    Engine::new(Some(root.path().join("missing.toml").as_path()), Some(root.path()))
        .await
        .unwrap()
}

#[tokio::test]
async fn apply_moves_type_and_prunes_both_files() {
    let temp = TempDir::new().unwrap();
    temp.child("Order.cs").write_str(ORDERS).unwrap();
    temp.child("Parcel.cs").write_str(SHIPPING).unwrap();

    let mut engine = engine(&temp).await;
    let plan = engine
        .apply(temp.child("Order.cs").path(), &Selector::Type("OrderLine".to_string()), false)
        .await
        .unwrap();
    assert!(plan.is_some());

    temp.child("OrderLine.cs").assert(r#"using Acme.Shipping;

namespace Acme.Orders
{
    /// <summary>An order line.</summary>
    public class OrderLine
    {
        public Parcel Parcel { get; set; }
    }
}
"#);

    temp.child("Order.cs").assert(
        predicate::str::contains("using System;\nusing System.Collections.Generic;\n\nnamespace Acme.Orders")
            .and(predicate::str::contains("public Parcel Parcel").not())
            .and(predicate::str::contains("using Acme.Shipping;").not()),
    );

    temp.close().unwrap();
}

#[tokio::test]
async fn dry_run_leaves_disk_untouched() {
    let temp = TempDir::new().unwrap();
    temp.child("Order.cs").write_str(ORDERS).unwrap();

    let mut engine = engine(&temp).await;
    let plan = engine
        .apply(temp.child("Order.cs").path(), &Selector::Type("OrderLine".to_string()), true)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(plan.edits.created_file(), "OrderLine.cs");
    temp.child("OrderLine.cs").assert(predicate::path::missing());
    temp.child("Order.cs").assert(ORDERS);
}

#[tokio::test]
async fn existing_target_file_blocks_the_move() {
    let temp = TempDir::new().unwrap();
    temp.child("Order.cs").write_str(ORDERS).unwrap();
    temp.child("orderline.cs").write_str("// placeholder\n").unwrap();

    let mut engine = engine(&temp).await;
    let error = engine
        .apply(temp.child("Order.cs").path(), &Selector::Type("OrderLine".to_string()), false)
        .await
        .unwrap_err();

    assert!(matches!(
        error.downcast_ref::<SplitError>(),
        Some(SplitError::NameCollision { .. })
    ));
    temp.child("Order.cs").assert(ORDERS);
    temp.child("orderline.cs").assert("// placeholder\n");
}

#[tokio::test]
async fn split_all_leaves_one_type_per_file() {
    let temp = TempDir::new().unwrap();
    temp.child("Shapes.cs")
        .write_str("namespace Geo\n{\n    public struct Point { }\n\n    public record Circle(Point Center);\n}\n")
        .unwrap();

    let mut engine = engine(&temp).await;
    let edits = engine.split_all(temp.child("Shapes.cs").path(), false).await.unwrap();
    assert_eq!(edits.len(), 2);

    temp.child("Shapes.cs").assert(predicate::path::missing());
    temp.child("Point.cs").assert("namespace Geo\n{\n    public struct Point { }\n}\n");
    temp.child("Circle.cs").assert("namespace Geo\n{\n    public record Circle(Point Center);\n}\n");
}
