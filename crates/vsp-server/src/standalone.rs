//! Running a simulation without a control session.

use tokio_util::sync::CancellationToken;
use tracing::info;
use vsp_core::{Dispatcher, Kernel, Progress, Registry, RunOutcome, RunRequest, SimTime};
use vsp_proto::Signal;

use crate::ServerError;

/// Run the simulation for `duration`, or until it suspends when `None`.
///
/// Cancelling `shutdown` stops the kernel as a Terminate signal would. The
/// scheduler gets a yield between kernel units.
///
/// # Errors
///
/// Returns [`ServerError::Control`] if the dispatcher is not idle.
pub async fn run_standalone<K: Kernel, R: Registry>(
    dispatcher: &mut Dispatcher<K, R>,
    duration: Option<SimTime>,
    shutdown: &CancellationToken,
) -> Result<RunOutcome, ServerError> {
    dispatcher.settle()?;
    let request = duration.map_or(RunRequest::UNBOUNDED, RunRequest::new);
    dispatcher.begin_run(request)?;
    info!(duration = %request.duration(), "running standalone");

    let mut stopping = false;
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled(), if !stopping => {
                info!("shutdown requested");
                stopping = true;
                dispatcher.interrupt(Signal::Terminate)?;
            }
            () = tokio::task::yield_now() => {
                if dispatcher.run_unit()? == Progress::Settled {
                    break;
                }
            }
        }
    }

    let outcome = dispatcher.finish_run(false)?;
    let kernel = dispatcher.kernel();
    info!(time = %kernel.now(), deltas = kernel.delta_count(), "simulation finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use vsp_core::{RunState, SimStatus};
    use vsp_sim::{EventKernel, demo_platform};

    use super::*;

    fn demo() -> Dispatcher<EventKernel, vsp_sim::Platform> {
        let mut kernel = EventKernel::new();
        let platform = demo_platform(&mut kernel);
        Dispatcher::new(kernel, platform)
    }

    #[tokio::test]
    async fn bounded_run_reaches_duration() {
        let mut d = demo();
        let token = CancellationToken::new();
        let outcome = run_standalone(&mut d, Some(SimTime::from_us(45)), &token).await.unwrap();

        assert_eq!(outcome, RunOutcome::Reply(String::new()));
        assert_eq!(d.kernel().now(), SimTime::from_us(45));
        assert_eq!(d.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn cancelled_run_stops_kernel() {
        let mut d = demo();
        let token = CancellationToken::new();
        token.cancel();
        let outcome = run_standalone(&mut d, None, &token).await.unwrap();

        assert_eq!(outcome, RunOutcome::Terminate { packet: "STOP" });
        assert_eq!(d.kernel().status(), SimStatus::UserStop);
        assert_eq!(d.state(), RunState::Terminated);
    }
}
