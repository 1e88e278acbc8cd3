use tabled::Tabled;

#[derive(Tabled)]
pub struct OperationRow {
    pub operation_id: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub transport_errors: u64,
    #[tabled(display = "percent")]
    pub error_rate: f64,
    pub avg_time_ms: String,
    pub p95_time_ms: String,
    pub max_time_ms: String,
}

fn percent(n: &f64) -> String {
    format!("{:.2}%", n * 100.0)
}
