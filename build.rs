fn main() {
    // Generates OUT_DIR/built.rs with the git commit used by /health and the X-App header.
    if let Err(err) = built::write_built_file() {
        println!("cargo:warning=failed to acquire build-time information: {err}");
    }
}
