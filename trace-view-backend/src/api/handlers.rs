pub mod trace;

pub(crate) async fn ready() -> &'static str {
    "ok"
}
