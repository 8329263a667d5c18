use std::env;
use std::fs;
use std::path::Path;

// Places Info.plist next to the binary so macOS shows the camera prompt.
fn main() {
    println!("cargo:rerun-if-changed=Info.plist");

    let (Ok(out_dir), Ok(manifest_dir)) = (env::var("OUT_DIR"), env::var("CARGO_MANIFEST_DIR")) else {
        println!("cargo:warning=OUT_DIR or CARGO_MANIFEST_DIR unset, skipping Info.plist");
        return;
    };

    let src = Path::new(&manifest_dir).join("Info.plist");
    let dst = Path::new(&out_dir).join("../../../Info.plist");

    if src.exists() {
        if let Err(e) = fs::copy(&src, &dst) {
            println!("cargo:warning=failed to copy Info.plist: {e}");
        }
    }
}
