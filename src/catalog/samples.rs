//! Starter queries for the ad-hoc explorer.

use super::TpchSchema;

/// A named example query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleQuery {
    pub name: &'static str,
    pub sql: String,
}

/// Sample queries qualified with `schema`.
pub fn sample_queries(schema: &TpchSchema) -> Vec<SampleQuery> {
    let t = |name: &str| schema.table(name);

    vec![
        SampleQuery {
            name: "Top 5 customers with most orders",
            sql: format!(
                "SELECT c.c_name, COUNT(*) AS order_count
FROM {orders} o
JOIN {customer} c ON o.o_custkey = c.c_custkey
GROUP BY c.c_name
ORDER BY order_count DESC
LIMIT 5",
                orders = t("orders"),
                customer = t("customer"),
            ),
        },
        SampleQuery {
            name: "Monthly revenue growth",
            sql: format!(
                "SELECT
    DATE_TRUNC('month', o_orderdate) AS month,
    SUM(o_totalprice) AS revenue
FROM {orders}
GROUP BY DATE_TRUNC('month', o_orderdate)
ORDER BY month",
                orders = t("orders"),
            ),
        },
        SampleQuery {
            name: "Part sales by type",
            sql: format!(
                "SELECT
    p.p_type,
    SUM(l.l_extendedprice) AS total_sales
FROM {lineitem} l
JOIN {part} p ON l.l_partkey = p.p_partkey
GROUP BY p.p_type
ORDER BY total_sales DESC
LIMIT 10",
                lineitem = t("lineitem"),
                part = t("part"),
            ),
        },
    ]
}
