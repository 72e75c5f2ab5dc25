pub async fn root() -> &'static str {
    "hello, world"
}
