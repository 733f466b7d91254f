//! Shared schema fixtures for unit tests

use crate::schema::{
    Column, DataType, Database, ForeignKey, Identity, KeyConstraint, QualifiedName, Table, View,
};

pub(crate) fn dbo(name: &str) -> QualifiedName {
    QualifiedName::new("dbo", name)
}

pub(crate) fn int(name: &str, nullable: bool) -> Column {
    Column::new(name, DataType::Int, nullable)
}

pub(crate) fn nvarchar(name: &str, length: u32, nullable: bool) -> Column {
    Column::new(name, DataType::NVarChar, nullable).with_length(length)
}

/// Table with a single-column identity primary key on its first column
pub(crate) fn keyed_table(name: &str, columns: Vec<Column>) -> Table {
    let key = columns[0].name.clone();
    let mut table = Table::new("dbo", name, columns);
    table.primary_key = Some(KeyConstraint::new(format!("PK_{name}"), &[key.as_str()]));
    table.identity = Some(Identity {
        column: key,
        seed: 1,
        increment: 1,
    });
    table
}

pub(crate) fn fk(name: &str, columns: &[&str], target: &str) -> ForeignKey {
    ForeignKey::new(name, columns, dbo(target))
}

/// Transfers referencing two `Accounts` tables that live in different
/// schemas and so share an entity name
pub(crate) fn transfers() -> Database {
    let accounts = keyed_table("Accounts", vec![int("AccountID", false)]);
    let mut legacy = keyed_table("Accounts", vec![int("AccountID", false)]);
    legacy.schema = "legacy".to_string();
    let mut transfers = keyed_table(
        "Transfers",
        vec![
            int("TransferID", false),
            int("AccountID", false),
            int("LegacyAccountID", true),
        ],
    );
    transfers.foreign_keys = vec![
        fk("FK_New", &["AccountID"], "Accounts"),
        ForeignKey::new(
            "FK_Old",
            &["LegacyAccountID"],
            QualifiedName::new("legacy", "Accounts"),
        ),
    ];
    Database::new("db", "dbo", vec![accounts, legacy, transfers], vec![])
        .expect("transfers fixture is valid")
}

/// A trimmed Northwind schema covering nullable and non-nullable foreign
/// keys, a self reference, a composite primary key and a view
pub(crate) fn northwind() -> Database {
    let mut categories = keyed_table(
        "Categories",
        vec![
            int("CategoryID", false),
            nvarchar("CategoryName", 15, false),
            Column::new("Description", DataType::NText, true),
            Column::new("Picture", DataType::Image, true),
        ],
    );
    categories
        .uniques
        .push(KeyConstraint::new("UQ_CategoryName", &["CategoryName"]));

    let suppliers = keyed_table(
        "Suppliers",
        vec![
            int("SupplierID", false),
            nvarchar("CompanyName", 40, false),
            nvarchar("ContactName", 30, true),
        ],
    );

    let mut products = keyed_table(
        "Products",
        vec![
            int("ProductID", false),
            nvarchar("ProductName", 40, false),
            int("SupplierID", true),
            int("CategoryID", true),
            Column::new("UnitPrice", DataType::Money, true),
            Column::new("Discontinued", DataType::Bit, false),
        ],
    );
    products.foreign_keys = vec![
        fk("FK_Products_Suppliers", &["SupplierID"], "Suppliers"),
        fk("FK_Products_Categories", &["CategoryID"], "Categories"),
    ];

    let mut employees = keyed_table(
        "Employees",
        vec![
            int("EmployeeID", false),
            nvarchar("LastName", 20, false),
            nvarchar("FirstName", 10, false),
            int("ReportsTo", true),
        ],
    );
    employees.foreign_keys = vec![fk("FK_Employees_Employees", &["ReportsTo"], "Employees")];

    let shippers = keyed_table(
        "Shippers",
        vec![
            int("ShipperID", false),
            nvarchar("CompanyName", 40, false),
            nvarchar("ContactName", 30, true),
        ],
    );

    let mut customers = Table::new(
        "dbo",
        "Customers",
        vec![
            Column::new("CustomerID", DataType::NChar, false).with_length(5),
            nvarchar("CompanyName", 40, false),
            nvarchar("ContactName", 30, true),
        ],
    );
    customers.primary_key = Some(KeyConstraint::new("PK_Customers", &["CustomerID"]));

    let mut orders = keyed_table(
        "Orders",
        vec![
            int("OrderID", false),
            Column::new("CustomerID", DataType::NChar, true).with_length(5),
            int("EmployeeID", false),
            Column::new("OrderDate", DataType::DateTime, true),
            int("ShipVia", true),
            Column::new("Freight", DataType::Money, true),
        ],
    );
    orders.foreign_keys = vec![
        fk("FK_Orders_Customers", &["CustomerID"], "Customers"),
        fk("FK_Orders_Employees", &["EmployeeID"], "Employees"),
        fk("FK_Orders_Shippers", &["ShipVia"], "Shippers"),
    ];

    let mut order_details = Table::new(
        "dbo",
        "Order Details",
        vec![
            int("OrderID", false),
            int("ProductID", false),
            Column::new("UnitPrice", DataType::Money, false),
            Column::new("Quantity", DataType::SmallInt, false),
            Column::new("Discount", DataType::Real, false).with_precision(24, None),
        ],
    );
    order_details.primary_key = Some(KeyConstraint::new(
        "PK_Order_Details",
        &["OrderID", "ProductID"],
    ));
    order_details.foreign_keys = vec![
        fk("FK_Order_Details_Orders", &["OrderID"], "Orders"),
        fk("FK_Order_Details_Products", &["ProductID"], "Products"),
    ];

    let product_list = View::new(
        "dbo",
        "Current Product List",
        vec![int("ProductID", false), nvarchar("ProductName", 40, false)],
    );

    Database::new(
        "Northwind",
        "dbo",
        vec![
            categories,
            suppliers,
            products,
            employees,
            shippers,
            customers,
            orders,
            order_details,
        ],
        vec![product_list],
    )
    .expect("fixture schema is well-formed")
}
