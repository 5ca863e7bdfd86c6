use serde::Serialize;

use crate::disease::Counts;

/// Infected counts per destination group and overall compartment totals, one
/// entry per step.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SimOutput {
    pub group_names: Vec<String>,
    pub times: Vec<f64>,
    pub infected_by_group: Vec<Vec<usize>>,
    pub totals: Vec<Counts>,
    pub new_infections: Vec<usize>,
}

impl SimOutput {
    pub fn new(group_names: Vec<String>, len: usize) -> SimOutput {
        SimOutput {
            group_names,
            times: Vec::with_capacity(len),
            infected_by_group: Vec::with_capacity(len),
            totals: Vec::with_capacity(len),
            new_infections: Vec::with_capacity(len),
        }
    }

    pub fn record(&mut self, time: f64, by_group: Vec<usize>, totals: Counts, new: usize) {
        self.times.push(time);
        self.infected_by_group.push(by_group);
        self.totals.push(totals);
        self.new_infections.push(new);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn group_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::with_capacity(self.len() * self.group_names.len());
        for (step, (time, counts)) in self.times.iter().zip(&self.infected_by_group).enumerate() {
            for (name, infected) in self.group_names.iter().zip(counts) {
                rows.push(vec![
                    step.to_string(),
                    time.to_string(),
                    name.clone(),
                    infected.to_string(),
                ]);
            }
        }
        rows
    }

    pub fn total_rows(&self) -> Vec<Vec<String>> {
        self.times
            .iter()
            .zip(&self.totals)
            .zip(&self.new_infections)
            .enumerate()
            .map(|(step, ((time, totals), new))| {
                vec![
                    step.to_string(),
                    time.to_string(),
                    totals.susceptible.to_string(),
                    totals.infected.to_string(),
                    totals.recovered.to_string(),
                    new.to_string(),
                ]
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub replicate: u64,
    pub input_digest: String,
    pub disease: String,
    pub n_agents: usize,
    pub steps: usize,
    pub cumulative_infections: usize,
    pub peak_infected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        let mut output = SimOutput::new(vec!["a".to_string(), "b".to_string()], 2);
        let totals = Counts {
            susceptible: 8,
            infected: 2,
            recovered: 0,
        };
        output.record(0.0, vec![2, 0], totals, 1);
        output.record(0.5, vec![1, 1], totals, 0);
        assert_eq!(output.len(), 2);
        let rows = output.group_rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], vec!["1", "0.5", "b", "1"]);
        assert_eq!(output.total_rows()[0], vec!["0", "0", "8", "2", "0", "1"]);
    }
}
