use std::env;

fn main() {
    let mut build = cc::Build::new();

    build
        .file("native/testbed.c")
        .warnings(true)
        .flag_if_supported("-std=c99")
        .flag_if_supported("-O2");

    // Keep frame layouts predictable for the convention fixtures on 32-bit x86
    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if target_arch == "x86" {
        build.flag_if_supported("-fno-omit-frame-pointer");
    }

    // cc emits the link directives for the static archive
    build.compile("cppcall_testbed");

    println!("cargo:rerun-if-changed=native/testbed.c");
    println!("cargo:rerun-if-changed=build.rs");
}
