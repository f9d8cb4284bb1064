//! Transport-level commands, placed ahead of the device's in the table
//!
//! | trigger | tag | effect |
//! |---------|-----|--------|
//! | `SETPAIR=<0\|1>` | `PAIR` | set/clear pairing with the sender |
//! | `SHUTDOWN` | `SHUTDOWN` | stop both transport loops |
//! | `SETPUSHPERIOD[=<seconds>]` | `PUSHPERIOD` | set or read the push period |
//! | `SENDUPDATE` | `UPDATE` | push telemetry now |

use super::state::TransportContext;
use super::table::{CommandEntry, Request};
use crate::core::types::{parse_float, parse_integer};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Built-in command entries bound to `context`
pub fn builtin_commands(context: &Arc<TransportContext>) -> Vec<CommandEntry> {
    let pair_ctx = Arc::clone(context);
    let shutdown_ctx = Arc::clone(context);
    let period_ctx = Arc::clone(context);
    let update_ctx = Arc::clone(context);

    vec![
        CommandEntry::handler("SETPAIR", "PAIR", move |req: &Request<'_>| -> Result<String> {
            set_pair(&pair_ctx, req)
        }),
        CommandEntry::handler("SHUTDOWN", "SHUTDOWN", move |req: &Request<'_>| -> Result<String> {
            log::info!("Shutdown requested by {}", req.sender);
            shutdown_ctx.request_shutdown();
            Ok("1".to_string())
        }),
        CommandEntry::handler("SETPUSHPERIOD", "PUSHPERIOD", move |req: &Request<'_>| -> Result<String> {
            set_push_period(&period_ctx, req)
        }),
        CommandEntry::handler("SENDUPDATE", "UPDATE", move |_: &Request<'_>| -> Result<String> {
            update_ctx.request_update();
            Ok("1".to_string())
        }),
    ]
}

fn set_pair(context: &TransportContext, req: &Request<'_>) -> Result<String> {
    let argument = req
        .argument
        .ok_or_else(|| Error::InvalidArgument("SETPAIR requires 0 or 1".to_string()))?;
    let paired = parse_integer(argument)? != 0;
    context.set_paired(paired, req.sender);
    Ok(if paired { "1" } else { "0" }.to_string())
}

fn set_push_period(context: &TransportContext, req: &Request<'_>) -> Result<String> {
    if let Some(argument) = req.argument {
        let secs = parse_float(argument)?;
        let period = Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|p| !p.is_zero())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("push period must be positive, got {}", secs))
            })?;
        context.set_push_period(period);
        log::info!("Push period set to {}s by {}", secs, req.sender);
    }
    Ok(format_secs(context.push_period()))
}

/// Whole seconds print without a fraction
fn format_secs(period: Duration) -> String {
    format!("{}", period.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::state::PusherSignal;
    use crate::transport::table::{Action, CommandTable};
    use std::net::SocketAddr;

    fn sender() -> SocketAddr {
        "192.168.1.101:40000".parse().unwrap()
    }

    fn run(table: &CommandTable, message: &str) -> Result<String> {
        let (entry, argument) = table.find(message).expect("builtin should match");
        let Action::Handler(handler) = &entry.action else {
            panic!("builtins are handlers");
        };
        handler.handle(&Request {
            argument,
            sender: sender(),
        })
    }

    fn setup() -> (
        Arc<TransportContext>,
        crossbeam_channel::Receiver<PusherSignal>,
        CommandTable,
    ) {
        let (ctx, rx) = TransportContext::new(Duration::from_secs(60));
        let ctx = Arc::new(ctx);
        let table = CommandTable::merged(builtin_commands(&ctx), Vec::new());
        (ctx, rx, table)
    }

    #[test]
    fn test_builtin_order_and_tags() {
        let (_ctx, _rx, table) = setup();
        let triggers: Vec<_> = table.iter().map(|e| e.trigger.as_str()).collect();
        assert_eq!(triggers, ["SETPAIR", "SHUTDOWN", "SETPUSHPERIOD", "SENDUPDATE"]);
        let tags: Vec<_> = table.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, ["PAIR", "SHUTDOWN", "PUSHPERIOD", "UPDATE"]);
    }

    #[test]
    fn test_setpair() {
        let (ctx, _rx, table) = setup();
        assert_eq!(run(&table, "SETPAIR=1").unwrap(), "1");
        assert_eq!(ctx.paired_peer(), Some(sender()));

        assert_eq!(run(&table, "SETPAIR=0").unwrap(), "0");
        assert!(!ctx.is_paired());
    }

    #[test]
    fn test_setpair_rejects_missing_or_bad_argument() {
        let (ctx, _rx, table) = setup();
        assert!(run(&table, "SETPAIR").is_err());
        assert!(run(&table, "SETPAIR=yes").is_err());
        assert!(!ctx.is_paired());
    }

    #[test]
    fn test_shutdown() {
        let (ctx, rx, table) = setup();
        assert_eq!(run(&table, "SHUTDOWN").unwrap(), "1");
        assert!(ctx.should_exit());
        assert_eq!(rx.try_recv(), Ok(PusherSignal::Shutdown));
    }

    #[test]
    fn test_push_period() {
        let (ctx, rx, table) = setup();
        assert_eq!(run(&table, "SETPUSHPERIOD").unwrap(), "60");
        assert!(rx.try_recv().is_err());

        assert_eq!(run(&table, "SETPUSHPERIOD=15").unwrap(), "15");
        assert_eq!(ctx.push_period(), Duration::from_secs(15));
        assert_eq!(rx.try_recv(), Ok(PusherSignal::Reschedule));

        assert_eq!(run(&table, "SETPUSHPERIOD=0.5").unwrap(), "0.5");
    }

    #[test]
    fn test_push_period_rejects_non_positive() {
        let (ctx, _rx, table) = setup();
        assert!(run(&table, "SETPUSHPERIOD=0").is_err());
        assert!(run(&table, "SETPUSHPERIOD=-3").is_err());
        assert!(run(&table, "SETPUSHPERIOD=soon").is_err());
        assert_eq!(ctx.push_period(), Duration::from_secs(60));
    }

    #[test]
    fn test_sendupdate() {
        let (_ctx, rx, table) = setup();
        assert_eq!(run(&table, "SENDUPDATE").unwrap(), "1");
        assert_eq!(rx.try_recv(), Ok(PusherSignal::Update));
    }
}
