use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SHADER: &str = "#define TILE 8\n\
struct Light { float3 color; };\n\
StructuredBuffer<Light> Lights : register(t2);\n\
[numthreads(TILE, TILE, 1)]\n\
void cull(uint3 id : SV_DispatchThreadID) { }\n";

fn bin() -> String {
    std::env::var("CARGO_BIN_EXE_hlslr").unwrap_or_else(|_| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../target/debug/hlslr")
            .to_string_lossy()
            .to_string()
    })
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hlslr_cli_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "debug")
        .output()
        .expect("failed to spawn hlslr")
}

#[test]
fn build_generates_then_skips() {
    let dir = scratch_dir("build");
    std::fs::create_dir_all(dir.join("shaders/lighting")).unwrap();
    std::fs::write(dir.join("shaders/lighting/cull.hlsl"), SHADER).unwrap();

    let first = run(&dir, &["build", "shaders", "--out-dir", "gen"]);
    assert!(first.status.success(), "build failed: {first:?}");
    let header_path = dir.join("gen/lighting/cull.hlsl.inl");
    let header = std::fs::read_to_string(&header_path).unwrap();
    assert!(header.contains("#define TILE 8"));
    assert!(header.contains("static constexpr uint3 InvokeSize = uint3(TILE, TILE, 1);"));
    assert!(header.contains(": Lights(ctx, \"Lights\", \"t2\")"));
    assert!(String::from_utf8_lossy(&first.stdout).contains("1 generated"));

    let second = run(&dir, &["build", "shaders", "--out-dir", "gen"]);
    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stdout).contains("0 generated, 1 up to date"));
    assert!(String::from_utf8_lossy(&second.stderr).contains("is up to date"));

    let forced = run(&dir, &["build", "shaders", "--out-dir", "gen", "--force"]);
    assert!(String::from_utf8_lossy(&forced.stdout).contains("1 generated"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn build_reports_failures_and_exits_nonzero() {
    let dir = scratch_dir("failure");
    std::fs::write(dir.join("bad.hlsl"), "int x;\nint a[ ;\n").unwrap();
    std::fs::write(dir.join("good.hlsl"), "float4 tint;\n").unwrap();

    let output = run(&dir, &["build", "."]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad.hlsl:2:8"), "stderr: {stderr}");
    assert!(stderr.contains("1 of 2 shader(s) failed"), "stderr: {stderr}");
    assert!(dir.join("good.hlsl.inl").is_file());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn build_uses_config_file() {
    let dir = scratch_dir("config");
    std::fs::write(dir.join("a.fx"), "int x;\n").unwrap();
    std::fs::write(
        dir.join("hlslr.toml"),
        "[scan]\nextensions = [\"fx\"]\n\n[output]\nextension = \"h\"\n",
    )
    .unwrap();

    let output = run(&dir, &["build", "."]);
    assert!(output.status.success(), "build failed: {output:?}");
    assert!(dir.join("a.fx.h").is_file());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn check_and_inspect() {
    let dir = scratch_dir("inspect");
    std::fs::write(dir.join("cull.hlsl"), SHADER).unwrap();

    let check = run(&dir, &["check", "cull.hlsl"]);
    assert!(check.status.success());
    assert!(String::from_utf8_lossy(&check.stdout)
        .contains("ok (1 structs, 1 variables, 1 functions, 1 defines)"));

    let inspect = run(&dir, &["inspect", "cull.hlsl"]);
    assert!(inspect.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&inspect.stdout).expect("stdout is not valid JSON");
    assert_eq!(value["declarations"].as_array().unwrap().len(), 4);
    assert_eq!(value["declarations"][2]["Attribute"]["name"], "numthreads");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn init_writes_default_config() {
    let dir = scratch_dir("init");
    let output = run(&dir, &["init"]);
    assert!(output.status.success());
    let text = std::fs::read_to_string(dir.join("hlslr.toml")).unwrap();
    assert!(text.contains("dispatch_attribute = \"numthreads\""));

    let again = run(&dir, &["init"]);
    assert!(!again.status.success());

    let _ = std::fs::remove_dir_all(&dir);
}
