use std::env;
use std::fs;
use std::path::Path;

fn main() {
    copy_config();
}

/// Copies coca_config.json next to the built executable, unless one is there already.
fn copy_config() {
    let Ok(out_dir) = env::var("OUT_DIR") else {
        return;
    };
    // OUT_DIR is something like target/release/build/coca-timer-xxx/out
    let Some(target_dir) = Path::new(&out_dir).ancestors().nth(3) else {
        return;
    };

    let config_src = Path::new("coca_config.json");
    let config_dst = target_dir.join("coca_config.json");

    if config_src.exists() && !config_dst.exists() {
        let _ = fs::copy(config_src, &config_dst);
    }
    println!("cargo:rerun-if-changed=coca_config.json");
}
