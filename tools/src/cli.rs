// Jackson Coxson
// Command line surface, modeled on libimobiledevice's ideviceinfo options

use std::{ffi::OsString, net::IpAddr, path::PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command, error::ErrorKind, value_parser};

/// Lockdown domains the device is known to answer for
pub const DOMAINS: &[&str] = &[
    "com.apple.disk_usage",
    "com.apple.disk_usage.factory",
    "com.apple.mobile.battery",
    // com.apple.mobile.debug crashes lockdownd on some versions
    "com.apple.iqagent",
    "com.apple.purplebuddy",
    "com.apple.PurpleBuddy",
    "com.apple.mobile.chaperone",
    "com.apple.mobile.third_party_termination",
    "com.apple.mobile.lockdownd",
    "com.apple.mobile.lockdown_cache",
    "com.apple.xcode.developerdomain",
    "com.apple.international",
    "com.apple.mobile.data_sync",
    "com.apple.mobile.tethered_sync",
    "com.apple.mobile.mobile_application_usage",
    "com.apple.mobile.backup",
    "com.apple.mobile.nikita",
    "com.apple.mobile.restriction",
    "com.apple.mobile.user_preferences",
    "com.apple.mobile.sync_data_class",
    "com.apple.mobile.software_behavior",
    "com.apple.mobile.iTunes.SQLMusicLibraryPostProcessCommands",
    "com.apple.mobile.iTunes.accessories",
    "com.apple.mobile.internal",
    "com.apple.mobile.wireless_lockdown",
    "com.apple.fairplay",
    "com.apple.iTunes",
    "com.apple.mobile.iTunes.store",
    "com.apple.mobile.iTunes",
];

/// A domain is known when it contains one of [`DOMAINS`]
pub fn is_domain_known(domain: &str) -> bool {
    DOMAINS.iter().any(|known| domain.contains(known))
}

/// How a query result gets written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    KeyValue,
    Xml,
}

/// Which usbmuxd connection types may be picked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    /// Whether to lookup USB devices
    pub usb: bool,
    /// Whether to lookup network devices
    pub network: bool,
}

impl LookupOptions {
    pub fn new(usb: bool, network: bool) -> Self {
        if !usb && !network {
            // Default to USB
            Self {
                usb: true,
                network: false,
            }
        } else {
            Self { usb, network }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistiveAction {
    Enable,
    Disable,
    Get,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Lockdown GetValue on a domain and/or key
    Query {
        domain: Option<String>,
        key: Option<String>,
        format: OutputFormat,
    },
    /// Read or flip AssistiveTouchEnabledByiTunes
    Assistive(AssistiveAction),
    /// USB serial lookup. `None` means `--find` was given an empty argument
    FindDriver { product_id: Option<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub udid: Option<String>,
    pub lookup: LookupOptions,
    pub host: Option<IpAddr>,
    pub pairing_file: Option<PathBuf>,
    pub simple: bool,
    pub debug: bool,
    pub mode: Mode,
}

fn non_empty(
    what: &'static str,
) -> impl Fn(&str) -> Result<String, String> + Clone + Send + Sync {
    move |s: &str| {
        if s.is_empty() {
            Err(format!("{what} must not be empty!"))
        } else {
            Ok(s.to_string())
        }
    }
}

fn known_domains_help() -> String {
    let mut help = String::from("Known domains are:\n\n");
    for domain in DOMAINS {
        help.push_str("  ");
        help.push_str(domain);
        help.push('\n');
    }
    help.push_str("\nHomepage:    <https://github.com/jkcoxson/idevice>");
    help
}

pub fn command() -> Command {
    Command::new("ideviceinfo")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Show information about a connected device.")
        .disable_version_flag(true)
        .after_help(known_domains_help())
        .arg(
            Arg::new("udid")
                .short('u')
                .long("udid")
                .value_name("UDID")
                .value_parser(non_empty("UDID"))
                .help("target specific device by UDID"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .action(ArgAction::SetTrue)
                .help("connect to network device"),
        )
        .arg(
            Arg::new("simple")
                .short('s')
                .long("simple")
                .action(ArgAction::SetTrue)
                .help("use a simple connection to avoid auto-pairing with the device"),
        )
        .arg(
            Arg::new("domain")
                .short('q')
                .long("domain")
                .value_name("NAME")
                .value_parser(non_empty("'domain'"))
                .help("set domain of query to NAME. Default: None"),
        )
        .arg(
            Arg::new("key")
                .short('k')
                .long("key")
                .value_name("NAME")
                .value_parser(non_empty("'key'"))
                .help("only query key specified by NAME. Default: All keys."),
        )
        .arg(
            Arg::new("xml")
                .short('x')
                .long("xml")
                .action(ArgAction::SetTrue)
                .help("output information as xml plist instead of key/value pairs"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("enable communication debugging"),
        )
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::Version)
                .help("prints version information"),
        )
        .arg(
            Arg::new("assistive")
                .short('a')
                .long("assistive")
                .action(ArgAction::SetTrue)
                .overrides_with_all(["reset", "get"])
                .help("enable AssistiveTouch"),
        )
        .arg(
            Arg::new("reset")
                .short('r')
                .long("reset")
                .action(ArgAction::SetTrue)
                .overrides_with_all(["assistive", "get"])
                .help("disable AssistiveTouch"),
        )
        .arg(
            Arg::new("get")
                .short('g')
                .long("get")
                .action(ArgAction::SetTrue)
                .overrides_with_all(["assistive", "reset"])
                .help("print whether AssistiveTouch is enabled"),
        )
        .arg(
            Arg::new("find")
                .short('f')
                .long("find")
                .value_name("PID")
                .allow_hyphen_values(true)
                .help("print TRUE if an Apple USB device with product id PID has the UDID as serial"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .value_parser(value_parser!(IpAddr))
                .requires("pairing_file")
                .help("IP address of the device, skips usbmuxd"),
        )
        .arg(
            Arg::new("pairing_file")
                .long("pairing-file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .requires("host")
                .help("Path to the pairing file used with --host"),
        )
        .arg(
            Arg::new("ignored")
                .num_args(1..)
                .action(ArgAction::Append)
                .hide(true),
        )
}

/// Text to print for a parse failure. Real errors get the full usage appended
pub fn error_report(e: &clap::Error) -> String {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.render().to_string(),
        _ => format!("{}\n{}", e.render(), command().render_help()),
    }
}

/// Parses a product id the way C's `atoi` would, with an added `0x` form
pub fn parse_product_id(arg: &str) -> i64 {
    let arg = arg.trim_start();
    if let Some(hex) = arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).unwrap_or(0);
    }

    let (negative, digits) = match arg.as_bytes().first() {
        Some(b'-') => (true, &arg[1..]),
        Some(b'+') => (false, &arg[1..]),
        _ => (false, arg),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end].parse::<i64>().unwrap_or(0);
    if negative { -value } else { value }
}

impl Options {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let mode = if let Some(find) = matches.get_one::<String>("find") {
            Mode::FindDriver {
                product_id: (!find.is_empty()).then(|| parse_product_id(find)),
            }
        } else if matches.get_flag("assistive") {
            Mode::Assistive(AssistiveAction::Enable)
        } else if matches.get_flag("reset") {
            Mode::Assistive(AssistiveAction::Disable)
        } else if matches.get_flag("get") {
            Mode::Assistive(AssistiveAction::Get)
        } else {
            Mode::Query {
                domain: matches.get_one::<String>("domain").cloned(),
                key: matches.get_one::<String>("key").cloned(),
                format: if matches.get_flag("xml") {
                    OutputFormat::Xml
                } else {
                    OutputFormat::KeyValue
                },
            }
        };

        let network = matches.get_flag("network");
        Self {
            udid: matches.get_one::<String>("udid").cloned(),
            lookup: LookupOptions::new(!network, network),
            host: matches.get_one::<IpAddr>("host").copied(),
            pairing_file: matches.get_one::<PathBuf>("pairing_file").cloned(),
            simple: matches.get_flag("simple"),
            debug: matches.get_flag("debug"),
            mode,
        }
    }
}

/// Parses arguments without exiting, help and version come back as errors
pub fn try_parse_from<I, T>(args: I) -> Result<Options, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    Ok(Options::from_matches(&matches))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, clap::Error> {
        try_parse_from(std::iter::once("ideviceinfo").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_to_a_full_usb_query() {
        let options = parse(&[]).unwrap();
        assert_eq!(options.udid, None);
        assert_eq!(options.lookup, LookupOptions::new(true, false));
        assert!(!options.simple);
        assert_eq!(
            options.mode,
            Mode::Query {
                domain: None,
                key: None,
                format: OutputFormat::KeyValue
            }
        );
    }

    #[test]
    fn query_options() {
        let options = parse(&[
            "-u",
            "00008030-001A2C3E0C42802E",
            "-q",
            "com.apple.mobile.battery",
            "-k",
            "BatteryCurrentCapacity",
            "-x",
            "-s",
        ])
        .unwrap();
        assert_eq!(options.udid.as_deref(), Some("00008030-001A2C3E0C42802E"));
        assert!(options.simple);
        assert_eq!(
            options.mode,
            Mode::Query {
                domain: Some("com.apple.mobile.battery".into()),
                key: Some("BatteryCurrentCapacity".into()),
                format: OutputFormat::Xml
            }
        );
    }

    #[test]
    fn network_flag_switches_lookup() {
        let options = parse(&["--network"]).unwrap();
        assert_eq!(
            options.lookup,
            LookupOptions {
                usb: false,
                network: true
            }
        );
    }

    #[test]
    fn empty_values_are_rejected_with_exit_code_2() {
        for args in [["-u", ""], ["--domain", ""], ["-k", ""]] {
            let e = parse(&args).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::ValueValidation);
            assert_eq!(e.exit_code(), 2);
            assert!(e.to_string().contains("must not be empty!"));

            let report = error_report(&e);
            assert!(report.contains("must not be empty!"));
            assert!(report.contains("Usage: ideviceinfo"));
            assert!(report.contains("Known domains are:"));
        }
    }

    #[test]
    fn unknown_and_incomplete_options_exit_2() {
        let e = parse(&["--frobnicate"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::UnknownArgument);
        assert_eq!(e.exit_code(), 2);

        let e = parse(&["-u"]).unwrap_err();
        assert_eq!(e.exit_code(), 2);

        let e = parse(&["--host", "10.0.0.2"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn help_and_version_exit_0() {
        let e = parse(&["-h"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::DisplayHelp);
        assert_eq!(e.exit_code(), 0);
        assert!(e.to_string().contains("com.apple.mobile.battery"));

        let e = parse(&["-v"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::DisplayVersion);
        assert_eq!(e.exit_code(), 0);
        assert_eq!(
            e.to_string().trim_end(),
            format!("ideviceinfo {}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn last_assistive_flag_wins() {
        assert_eq!(
            parse(&["-a"]).unwrap().mode,
            Mode::Assistive(AssistiveAction::Enable)
        );
        assert_eq!(
            parse(&["-a", "-r"]).unwrap().mode,
            Mode::Assistive(AssistiveAction::Disable)
        );
        assert_eq!(
            parse(&["-r", "-g"]).unwrap().mode,
            Mode::Assistive(AssistiveAction::Get)
        );
        assert_eq!(
            parse(&["-g", "-x", "-a"]).unwrap().mode,
            Mode::Assistive(AssistiveAction::Enable)
        );
    }

    #[test]
    fn find_takes_precedence() {
        let options = parse(&["-g", "-u", "abc", "-f", "4776"]).unwrap();
        assert_eq!(
            options.mode,
            Mode::FindDriver {
                product_id: Some(4776)
            }
        );

        let options = parse(&["-f", ""]).unwrap();
        assert_eq!(options.mode, Mode::FindDriver { product_id: None });

        let options = parse(&["-f", "-5"]).unwrap();
        assert_eq!(
            options.mode,
            Mode::FindDriver {
                product_id: Some(-5)
            }
        );
    }

    #[test]
    fn help_report_is_not_doubled() {
        let e = parse(&["--help"]).unwrap_err();
        let report = error_report(&e);
        assert_eq!(report.matches("Known domains are:").count(), 1);
    }

    #[test]
    fn stray_positionals_are_ignored() {
        let options = parse(&["foo", "bar"]).unwrap();
        assert_eq!(
            options.mode,
            Mode::Query {
                domain: None,
                key: None,
                format: OutputFormat::KeyValue
            }
        );

        let options = parse(&["-x", "foo"]).unwrap();
        assert_eq!(
            options.mode,
            Mode::Query {
                domain: None,
                key: None,
                format: OutputFormat::Xml
            }
        );
    }

    #[test]
    fn product_id_parses_like_atoi() {
        assert_eq!(parse_product_id("4776"), 4776);
        assert_eq!(parse_product_id("  4776abc"), 4776);
        assert_eq!(parse_product_id("abc"), 0);
        assert_eq!(parse_product_id("-12"), -12);
        assert_eq!(parse_product_id("0x12a8"), 0x12a8);
    }

    #[test]
    fn host_and_pairing_file_go_together() {
        let options = parse(&["--host", "10.0.0.2", "--pairing-file", "pair.plist"]).unwrap();
        assert_eq!(options.host, Some("10.0.0.2".parse().unwrap()));
        assert_eq!(options.pairing_file, Some(PathBuf::from("pair.plist")));

        let e = parse(&["--host", "not-an-ip", "--pairing-file", "pair.plist"]).unwrap_err();
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn domain_matching_is_by_substring() {
        assert!(is_domain_known("com.apple.mobile.battery"));
        assert!(is_domain_known("com.apple.mobile.iTunes.store"));
        assert!(is_domain_known("com.apple.mobile.battery.extra"));
        assert!(!is_domain_known("com.example.unknown"));
    }
}
