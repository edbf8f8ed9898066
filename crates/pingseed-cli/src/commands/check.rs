use pingseed_core::platform::{PlatformInfo, platform_info};
use pingseed_core::{IcmpServer, ProtocolFamily};
use serde::Serialize;

#[derive(Serialize)]
struct FamilyCheck {
    family: ProtocolFamily,
    ok: bool,
    error: Option<String>,
}

#[derive(Serialize)]
struct CheckReport {
    platform: PlatformInfo,
    families: Vec<FamilyCheck>,
}

pub fn run(json: bool) {
    let report = collect();

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                std::process::exit(1);
            }
        }
    } else {
        let info = &report.platform;
        println!("Platform: {} {} (Rust)", info.system, info.machine);
        println!(
            "Raw ICMP listening: {}",
            if info.supported { "supported" } else { "not supported" }
        );
        println!();
        for check in &report.families {
            match &check.error {
                None => println!("  \u{2705} {:<5} raw endpoint opened", check.family.to_string()),
                Some(e) => println!("  \u{274C} {:<5} {e}", check.family.to_string()),
            }
        }
    }

    if report.families.iter().all(|c| !c.ok) {
        std::process::exit(1);
    }
}

fn collect() -> CheckReport {
    // The receiver is never drained: probing does not produce seeds.
    let (server, _seeds) = IcmpServer::new();
    let families = ProtocolFamily::ALL
        .into_iter()
        .map(|family| match server.listener(family).probe() {
            Ok(()) => FamilyCheck {
                family,
                ok: true,
                error: None,
            },
            Err(e) => FamilyCheck {
                family,
                ok: false,
                error: Some(e.to_string()),
            },
        })
        .collect();

    CheckReport {
        platform: platform_info(),
        families,
    }
}
