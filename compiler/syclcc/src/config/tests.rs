use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

fn compile(env: &Environment, list: &[&str]) -> Config {
    match Config::resolve(env, &args(list)).unwrap() {
        Resolution::Compile(config) => *config,
        other => panic!("expected compile resolution, got {other:?}"),
    }
}

fn empty_env() -> Environment {
    Environment::default()
}

#[test]
fn test_no_args_is_usage() {
    assert_eq!(Config::resolve(&empty_env(), &[]).unwrap(), Resolution::Usage);
}

#[test]
fn test_help_wins_over_everything() {
    // Even a malformed flag does not matter once --help is present
    let resolution =
        Config::resolve(&empty_env(), &args(&["--hipsycl-platform", "a.cpp", "--help"])).unwrap();
    assert_eq!(resolution, Resolution::Help);
}

#[test]
fn test_driver_flags_are_consumed() {
    let config = compile(
        &empty_env(),
        &[
            "-O2",
            "--keep-temporary-files",
            "a.cpp",
            "--hipsycl-bootstrap",
            "--hipsycl-platform=cpu",
            "--cuda-clang-compiler=/opt/clang/bin/clang++",
            "--force-alternative-compiler=/usr/bin/g++",
            "-o",
            "a",
        ],
    );
    assert_eq!(config.forwarded_args, args(&["-O2", "a.cpp", "-o", "a"]));
    assert!(config.keep_temporaries);
    assert!(config.bootstrap);
    assert_eq!(config.platform, Some(Platform::Cpu));
    assert_eq!(
        config.cuda_clang_compiler,
        Some(PathBuf::from("/opt/clang/bin/clang++"))
    );
    assert_eq!(
        config.alternative_compiler,
        Some(PathBuf::from("/usr/bin/g++"))
    );
}

#[test]
fn test_platform_aliases() {
    let cases = [
        ("nvidia", Platform::Cuda),
        ("cuda", Platform::Cuda),
        ("nvcc", Platform::Nvcc),
        ("amd", Platform::Rocm),
        ("hcc", Platform::Rocm),
        ("hip", Platform::Rocm),
        ("rocm", Platform::Rocm),
        ("host", Platform::Cpu),
        ("hipcpu", Platform::Cpu),
        ("CPU", Platform::Cpu),
    ];
    for (name, expected) in cases {
        let flag = format!("--hipsycl-platform={name}");
        let config = compile(&empty_env(), &[&flag, "a.cpp"]);
        assert_eq!(config.platform, Some(expected), "alias {name}");
    }
}

#[test]
fn test_unknown_platform_is_error() {
    let err = Config::resolve(&empty_env(), &args(&["--hipsycl-platform=opencl"])).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownPlatform { ref name, .. } if name == "opencl"));
}

#[test]
fn test_unknown_platform_in_env_is_error() {
    let env = Environment::from_pairs([(PLATFORM_VAR, "fpga")]);
    let err = Config::resolve(&env, &args(&["a.cpp"])).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::UnknownPlatform {
            origin: PLATFORM_VAR,
            ..
        }
    ));
}

#[test]
fn test_env_values_apply() {
    let env = Environment::from_pairs([
        (PLATFORM_VAR, "amd"),
        (CUDA_CLANG_VAR, "/opt/llvm/bin/clang++"),
        (GPU_ARCH_VAR, "gfx900"),
        (HOST_COMPILER_VAR, "g++-9"),
        (INSTALL_PREFIX_VAR, "/opt/hipSYCL"),
    ]);
    let config = compile(&env, &["a.cpp"]);
    assert_eq!(config.platform, Some(Platform::Rocm));
    assert_eq!(
        config.cuda_clang_compiler,
        Some(PathBuf::from("/opt/llvm/bin/clang++"))
    );
    assert_eq!(config.gpu_arch.as_deref(), Some("gfx900"));
    assert_eq!(config.host_compiler, Some(PathBuf::from("g++-9")));
    assert_eq!(config.install_prefix, Some(PathBuf::from("/opt/hipSYCL")));
    assert!(config.warnings.is_empty());
}

#[test]
fn test_cli_overrides_env() {
    let env = Environment::from_pairs([
        (CUDA_CLANG_VAR, "/env/clang++"),
        (GPU_ARCH_VAR, "sm_35"),
    ]);
    let config = compile(
        &env,
        &[
            "--cuda-clang-compiler=/cli/clang++",
            "--hipsycl-gpu-arch=sm_70",
            "a.cpp",
        ],
    );
    assert_eq!(config.cuda_clang_compiler, Some(PathBuf::from("/cli/clang++")));
    assert_eq!(config.gpu_arch.as_deref(), Some("sm_70"));
}

#[test]
fn test_platform_conflict_warns_and_cli_wins() {
    let env = Environment::from_pairs([(PLATFORM_VAR, "cuda")]);
    let config = compile(&env, &["--hipsycl-platform=cpu", "a.cpp"]);
    assert_eq!(config.platform, Some(Platform::Cpu));
    assert_eq!(
        config.warnings,
        vec![ConfigWarning::PlatformConflict {
            env: Platform::Cuda,
            cli: Platform::Cpu,
        }]
    );
    let message = config.warnings[0].to_string();
    assert!(message.contains("using 'cpu'"), "{message}");
}

#[test]
fn test_same_platform_via_alias_is_no_conflict() {
    let env = Environment::from_pairs([(PLATFORM_VAR, "amd")]);
    let config = compile(&env, &["--hipsycl-platform=hip", "a.cpp"]);
    assert_eq!(config.platform, Some(Platform::Rocm));
    assert!(config.warnings.is_empty());
}

#[test]
fn test_empty_env_value_is_unset() {
    let env = Environment::from_pairs([(PLATFORM_VAR, ""), (HOST_COMPILER_VAR, "")]);
    let config = compile(&env, &["a.cpp"]);
    assert_eq!(config.platform, None);
    assert_eq!(config.host_compiler, None);
}

#[test]
fn test_restricted_paths_are_ordered_and_deduplicated() {
    let config = compile(
        &empty_env(),
        &[
            "--restrict-device-header-path=/b",
            "-RDI=/a",
            "a.cpp",
            "-RDI=/b",
            "--restrict-device-header-path=/c",
        ],
    );
    assert_eq!(config.restricted_device_header_paths, args(&["/b", "/a", "/c"]));
    assert_eq!(config.forwarded_args, args(&["a.cpp"]));
}

#[test]
fn test_malformed_flag_names_expected_form() {
    let err = Config::resolve(&empty_env(), &args(&["--cuda-clang-compiler"])).unwrap_err();
    assert_eq!(
        err,
        ConfigError::MalformedFlag {
            flag: "--cuda-clang-compiler".to_string(),
            expected: "--cuda-clang-compiler=<path>",
        }
    );
}

#[test]
fn test_help_text_lists_every_driver_flag() {
    let text = help();
    for flag in CompoundFlag::ALL {
        assert!(text.contains(flag.name()), "help misses {}", flag.name());
    }
    for flag in [KEEP_TEMPORARIES_FLAG, BOOTSTRAP_FLAG, HELP_FLAG] {
        assert!(text.contains(flag), "help misses {flag}");
    }
    assert!(usage().starts_with(&banner()));
}

#[test]
fn test_utf8_args_pass_through() {
    assert_eq!(utf8_args(&["-c", "a.cpp"]).unwrap(), args(&["-c", "a.cpp"]));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_argument_is_config_error() {
    use std::os::unix::ffi::OsStrExt;

    let raw = [OsStr::new("-c"), OsStr::from_bytes(b"caf\xe9.cpp")];
    let err = utf8_args(&raw).unwrap_err();
    assert_eq!(
        err,
        ConfigError::NonUtf8Argument {
            arg: "caf\u{fffd}.cpp".to_string(),
        }
    );
}

fn compound_flag() -> impl Strategy<Value = &'static str> {
    prop::sample::select(CompoundFlag::ALL.map(CompoundFlag::name).to_vec())
}

proptest! {
    #[test]
    fn prop_help_always_resolves_to_help(
        before in prop::collection::vec("[a-z.=-]{0,12}", 0..5),
        after in prop::collection::vec("[a-z.=-]{0,12}", 0..5),
    ) {
        let mut list = before;
        list.push("--help".to_string());
        list.extend(after);
        prop_assert_eq!(Config::resolve(&empty_env(), &list).unwrap(), Resolution::Help);
    }

    #[test]
    fn prop_missing_value_separator_is_malformed(flag in compound_flag(), tail in "[a-z/_]{0,8}") {
        let arg = format!("{flag}{tail}");
        let err = Config::resolve(&empty_env(), &[arg]).unwrap_err();
        let is_malformed = matches!(err, ConfigError::MalformedFlag { .. });
        prop_assert!(is_malformed);
    }

    #[test]
    fn prop_extra_equals_is_malformed(
        flag in compound_flag(),
        a in "[a-z/_]{0,6}",
        b in "[a-z/_]{0,6}",
    ) {
        let arg = format!("{flag}={a}={b}");
        let err = Config::resolve(&empty_env(), &[arg]).unwrap_err();
        let is_malformed = matches!(err, ConfigError::MalformedFlag { .. });
        prop_assert!(is_malformed);
    }

    #[test]
    fn prop_non_driver_args_keep_order(list in prop::collection::vec("[a-zA-Z0-9._/]{1,10}", 1..8)) {
        let config = match Config::resolve(&empty_env(), &list).unwrap() {
            Resolution::Compile(config) => *config,
            other => panic!("unexpected {other:?}"),
        };
        prop_assert_eq!(config.forwarded_args, list);
    }
}
