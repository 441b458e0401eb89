use super::*;
use crate::pipeline::TransformedSource;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

fn session(config: Config) -> Session {
    Session::new(config, Installation::new("/opt/hipSYCL"))
}

/// `a.cpp -c -o a.o` after the pipeline rewrote `src/a.cpp`.
fn transformed_compile_only() -> TransformedArgs {
    TransformedArgs {
        args: strings(&["/tmp/syclcc-x/0_a.cpp", "-c", "-o", "a.o"]),
        sources: vec![TransformedSource {
            original: PathBuf::from("src/a.cpp"),
            transformed: PathBuf::from("/tmp/syclcc-x/0_a.cpp"),
        }],
    }
}

// --- Platform ---

#[test]
fn test_platform_parse_is_case_and_space_insensitive() {
    assert_eq!(Platform::parse(" NVIDIA "), Some(Platform::Cuda));
    assert_eq!(Platform::parse("Hip"), Some(Platform::Rocm));
    assert_eq!(Platform::parse("opencl"), None);
    assert_eq!(Platform::parse(""), None);
}

#[test]
fn test_canonical_names_round_trip() {
    for platform in Platform::ALL {
        assert_eq!(Platform::parse(platform.name()), Some(platform));
        assert!(Platform::VALID_NAMES.contains(platform.name()));
    }
}

#[test]
fn test_template_pruning_only_for_nvcc_and_rocm() {
    let pruned: Vec<_> = Platform::ALL
        .into_iter()
        .filter(|p| p.requires_template_pruning())
        .collect();
    assert_eq!(pruned, vec![Platform::Nvcc, Platform::Rocm]);
}

// --- Shared argument rules ---

#[test]
fn test_link_stage_detection() {
    assert!(reaches_link_stage(&strings(&["a.cpp", "-o", "a"])));
    for flag in ["-c", "-E", "-S", "-fsyntax-only"] {
        assert!(!reaches_link_stage(&strings(&["a.cpp", flag])), "{flag}");
    }
    // Only exact matches count
    assert!(reaches_link_stage(&strings(&["-cxx-isystem", "-Ssomething"])));
}

#[test]
fn test_common_args_when_linking() {
    let s = session(Config::default());
    assert_eq!(
        common_args(&s, Platform::Cpu, true),
        strings(&[
            "-I/opt/hipSYCL/include",
            "-L/opt/hipSYCL/lib",
            "-lhipSYCL_cpu",
            "-I/opt/hipSYCL/include/hipSYCL/hipCPU",
        ])
    );
    assert_eq!(
        common_args(&s, Platform::Rocm, true),
        strings(&["-I/opt/hipSYCL/include", "-L/opt/hipSYCL/lib", "-lhipSYCL_rocm"])
    );
}

#[test]
fn test_common_args_compile_only_skip_runtime() {
    let s = session(Config::default());
    assert_eq!(
        common_args(&s, Platform::Nvcc, false),
        strings(&["-I/opt/hipSYCL/include", "-I/opt/hipSYCL/include/hipSYCL/cuda"])
    );
}

#[test]
fn test_common_args_bootstrap_never_links_runtime() {
    let s = session(Config {
        bootstrap: true,
        ..Config::default()
    });
    let args = common_args(&s, Platform::Cuda, true);
    assert!(args.iter().all(|a| !a.starts_with("-l") && !a.starts_with("-L")));
}

#[test]
fn test_shared_args_include_each_source_dir_once() {
    let s = session(Config::default());
    let mut transformed = transformed_compile_only();
    transformed.sources.push(TransformedSource {
        original: PathBuf::from("src/b.cpp"),
        transformed: PathBuf::from("/tmp/syclcc-x/1_b.cpp"),
    });
    transformed.sources.push(TransformedSource {
        original: PathBuf::from("c.cpp"),
        transformed: PathBuf::from("/tmp/syclcc-x/2_c.cpp"),
    });
    let shared = shared_invocation_args(&s, Platform::Rocm, &transformed, false);
    assert_eq!(
        shared,
        strings(&["-Isrc", "-I.", "-I/opt/hipSYCL/include"])
    );
}

// --- Detection ---

#[test]
fn test_from_available_fills_not_found() {
    let detection = BackendDetection::from_available(&[Platform::Nvcc]);
    assert!(detection.is_available(Platform::Nvcc));
    assert!(!detection.is_available(Platform::Cpu));
    assert_eq!(
        detection.not_found,
        vec![Platform::Cuda, Platform::Rocm, Platform::Cpu]
    );
}

#[test]
fn test_backend_platform_mapping() {
    let config = Config::default();
    let platforms: Vec<_> = Backend::all(&config).iter().map(Backend::platform).collect();
    assert_eq!(platforms, Platform::ALL.to_vec());
}

#[test]
fn test_detect_reports_unlaunchable_backends() {
    let config = Config {
        cuda_clang_compiler: Some(PathBuf::from("/nonexistent/syclcc-test/clang++")),
        host_compiler: Some(PathBuf::from("/nonexistent/syclcc-test/g++")),
        ..Config::default()
    };
    let backends = vec![
        Backend::new(Platform::Cpu, &config),
        Backend::new(Platform::Cuda, &config),
    ];
    let detection = BackendDetection::detect(&backends);
    assert!(detection.available.is_empty());
    // Probe order is kept
    assert_eq!(detection.not_found, vec![Platform::Cpu, Platform::Cuda]);
}

// --- Host ---

#[test]
fn test_first_launchable_respects_order() {
    let mut asked = Vec::new();
    let found = host::first_launchable(&host::KNOWN_COMPILERS, |name| {
        asked.push(name.to_string());
        name.starts_with("g++")
    });
    assert_eq!(found, Some(PathBuf::from("g++-10")));
    // Every clang variant is tried first
    assert_eq!(asked.len(), 8);
}

#[test]
fn test_first_launchable_none() {
    assert_eq!(host::first_launchable(&host::KNOWN_COMPILERS, |_| false), None);
}

#[test]
fn test_host_unresolvable_override_is_unavailable() {
    let config = Config {
        host_compiler: Some(PathBuf::from("/nonexistent/syclcc-test/c++")),
        ..Config::default()
    };
    let backend = HostBackend::new(&config);
    assert!(!backend.probe());
    let err = backend.run(&session(config), &strings(&["a.cpp"])).unwrap_err();
    assert!(matches!(
        err,
        DriverError::BackendUnavailable {
            platform: Platform::Cpu,
            hint: Some(_),
        }
    ));
}

#[test]
fn test_host_command_line_compile_only() {
    let s = session(Config::default());
    let transformed = transformed_compile_only();
    let shared = shared_invocation_args(&s, Platform::Cpu, &transformed, false);
    let cmd = host::command_line(&transformed, shared);
    assert_eq!(
        cmd,
        strings(&[
            "-Isrc",
            "-I/opt/hipSYCL/include",
            "-I/opt/hipSYCL/include/hipSYCL/hipCPU",
            "/tmp/syclcc-x/0_a.cpp",
            "-c",
            "-o",
            "a.o",
            "-std=c++14",
            "-Wno-ignored-attributes",
            "-Wno-unused-command-line-argument",
            "-fopenmp",
        ])
    );
}

// --- ROCm ---

#[test]
fn test_rocm_tool_flags_from_output() {
    let flags = RocmToolFlags::from_tool_output(
        "-hc -I/opt/rocm/include\n",
        " -hc -L/opt/rocm/lib -lhc_am\n",
        "/opt/rocm/hip\n",
    );
    assert_eq!(flags.cxx_flags, strings(&["-hc", "-I/opt/rocm/include"]));
    assert_eq!(flags.ld_flags, strings(&["-hc", "-L/opt/rocm/lib", "-lhc_am"]));
    assert_eq!(flags.link_args, strings(&["-L/opt/rocm/hip/lib", "-lhip_hcc"]));
}

#[test]
fn test_rocm_command_line_links_only_when_linking() {
    let flags = RocmToolFlags::from_tool_output("-hc", "-lhc_am", "/opt/rocm/hip");
    let transformed = transformed_compile_only();

    let compile = rocm::command_line(&flags, &transformed, Vec::new(), Some("gfx900"), false);
    assert_eq!(
        compile,
        strings(&[
            "-hc",
            "-amdgpu-target=gfx900",
            "/tmp/syclcc-x/0_a.cpp",
            "-c",
            "-o",
            "a.o",
            "-std=c++14",
            "-Wno-ignored-attributes",
            "-Wno-unused-command-line-argument",
        ])
    );

    let link = rocm::command_line(&flags, &transformed, Vec::new(), None, true);
    assert_eq!(
        link[..4].to_vec(),
        strings(&["-hc", "-lhc_am", "-L/opt/rocm/hip/lib", "-lhip_hcc"])
    );
    assert!(!link.iter().any(|a| a.starts_with("-amdgpu-target")));
}
