fn main() {
    // Version info shown in Explorer and Task Manager
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("windows") {
        let mut res = winresource::WindowsResource::new();
        res.set("ProductName", "deskstat");
        res.set("FileDescription", "Desktop statistics overlay");
        if let Err(e) = res.compile() {
            println!("cargo:warning=Failed to embed Windows resources: {}", e);
        }
    }
}
