use std::time::Duration;

use rand::{thread_rng, Rng};
use tokio::time::sleep;

use crate::config::TypingSection;

/// Pacing for clicks and keystrokes so composer interaction does not run
/// at machine speed. Delays are sampled up front and never held across an
/// await together with the RNG.
#[derive(Debug, Clone)]
pub struct HumanPacing {
    config: TypingSection,
}

impl HumanPacing {
    pub fn new(config: TypingSection) -> Self {
        Self { config }
    }

    pub async fn hesitate_before_click(&self) {
        let delay = sample_ms(self.config.click_hesitation_ms.map(u64::from));
        sleep(delay).await;
    }

    pub async fn keystroke_gap(&self) {
        let delay = self.typing_delay();
        sleep(delay).await;
    }

    /// Uniform pause in a configured millisecond range, e.g. between
    /// scroll bursts or playbook steps.
    pub async fn pause_in(&self, range_ms: [u64; 2]) {
        let delay = sample_ms(range_ms);
        sleep(delay).await;
    }

    fn typing_delay(&self) -> Duration {
        let mut rng = thread_rng();
        let [lo, hi] = self.config.cadence_cpm;
        let cadence = rng.gen_range(lo.min(hi)..=lo.max(hi)).max(60) as f64;
        let base = 60.0 / cadence;
        let [jlo, jhi] = self.config.jitter_ms;
        let jitter_ms = rng.gen_range(jlo.min(jhi)..=jlo.max(jhi));
        Duration::from_secs_f64(base + jitter_ms as f64 / 1000.0)
    }
}

fn sample_ms(range: [u64; 2]) -> Duration {
    let lo = range[0].min(range[1]);
    let hi = range[0].max(range[1]);
    let ms = thread_rng().gen_range(lo..=hi);
    Duration::from_millis(ms)
}
