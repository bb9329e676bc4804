//! Agent Registry: the fixed population of debating agents
//!
//! Builds the debate teams and the management roster once, and owns every
//! agent record for the lifetime of the engine. Other components read agents
//! through shared snapshots; only the statistics sink mutates them, through
//! the accessors below.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Stable agent identifier, assigned in construction order starting at 1
pub type AgentId = u32;

/// Initial performance for every agent
pub const INITIAL_PERFORMANCE: f64 = 0.5;

/// Team number used for the management roster
pub const MANAGEMENT_TEAM: u32 = 0;

/// Roles cycled through when filling a debate team
const TEAM_ROLES: [AgentRole; 4] = [
    AgentRole::Proposer,
    AgentRole::Solver,
    AgentRole::Adversary,
    AgentRole::Handler,
];

/// Role an agent plays in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Opens the debate with a position; the designated proposer breaks ties
    Proposer,
    /// Argues for a concrete way to solve the problem
    Solver,
    /// Attacks assumptions and surfaces risks
    Adversary,
    /// Synthesizes debate winners into candidate solutions
    Handler,
    Manager,
    Counsellor,
    Security,
    Boss,
    PuppetMaster,
}

impl AgentRole {
    pub fn all() -> &'static [AgentRole] {
        &[
            Self::Proposer,
            Self::Solver,
            Self::Adversary,
            Self::Handler,
            Self::Manager,
            Self::Counsellor,
            Self::Security,
            Self::Boss,
            Self::PuppetMaster,
        ]
    }

    /// Whether agents with this role take part in pairwise debates
    pub fn is_debater(self) -> bool {
        matches!(self, Self::Proposer | Self::Solver | Self::Adversary)
    }

    /// Ordered capability tags for a freshly created agent of this role
    pub fn default_specialization(self) -> &'static [&'static str] {
        match self {
            Self::Proposer => &["ideation", "framing", "synthesis"],
            Self::Solver => &["problem_solving", "analysis", "implementation"],
            Self::Adversary => &["critique", "risk_analysis", "analysis"],
            Self::Handler => &["synthesis", "integration", "communication"],
            Self::Manager => &["coordination", "planning"],
            Self::Counsellor => &["empathy", "communication"],
            Self::Security => &["risk_analysis", "compliance"],
            Self::Boss => &["strategy", "planning"],
            Self::PuppetMaster => &["strategy", "coordination"],
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposer => write!(f, "proposer"),
            Self::Solver => write!(f, "solver"),
            Self::Adversary => write!(f, "adversary"),
            Self::Handler => write!(f, "handler"),
            Self::Manager => write!(f, "manager"),
            Self::Counsellor => write!(f, "counsellor"),
            Self::Security => write!(f, "security"),
            Self::Boss => write!(f, "boss"),
            Self::PuppetMaster => write!(f, "puppet_master"),
        }
    }
}

/// Head counts for the management team (team 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementRoster {
    pub managers: u32,
    pub security: u32,
    pub counsellors: u32,
    pub bosses: u32,
    pub puppet_masters: u32,
}

impl Default for ManagementRoster {
    fn default() -> Self {
        Self {
            managers: 1,
            security: 1,
            counsellors: 5,
            bosses: 1,
            puppet_masters: 1,
        }
    }
}

impl ManagementRoster {
    /// A roster with no management agents at all
    pub fn empty() -> Self {
        Self {
            managers: 0,
            security: 0,
            counsellors: 0,
            bosses: 0,
            puppet_masters: 0,
        }
    }

    pub fn total(&self) -> u32 {
        [self.security, self.counsellors, self.bosses, self.puppet_masters]
            .into_iter()
            .fold(self.managers, u32::saturating_add)
    }

    /// Roles in construction order, one entry per head
    fn roles(&self) -> Vec<AgentRole> {
        let mut roles = Vec::with_capacity(self.total() as usize);
        roles.extend(std::iter::repeat(AgentRole::Manager).take(self.managers as usize));
        roles.extend(std::iter::repeat(AgentRole::Security).take(self.security as usize));
        roles.extend(std::iter::repeat(AgentRole::Counsellor).take(self.counsellors as usize));
        roles.extend(std::iter::repeat(AgentRole::Boss).take(self.bosses as usize));
        roles.extend(std::iter::repeat(AgentRole::PuppetMaster).take(self.puppet_masters as usize));
        roles
    }
}

/// A reasoning agent and its cumulative statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub role: AgentRole,
    /// 0 = management, 1..N = debate team
    pub team: u32,
    /// Performance score (0.0 - 1.0)
    pub performance: f64,
    pub specialization: Vec<String>,
    pub debate_wins: u32,
    pub consensus_votes: u32,
    pub sanctions: u32,
}

impl Agent {
    pub fn new(id: AgentId, role: AgentRole, team: u32) -> Self {
        Self {
            id,
            role,
            team,
            performance: INITIAL_PERFORMANCE,
            specialization: role
                .default_specialization()
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
            debate_wins: 0,
            consensus_votes: 0,
            sanctions: 0,
        }
    }

    /// Number of specialization tags shared with another agent
    pub fn specialization_overlap(&self, other: &Agent) -> usize {
        self.specialization
            .iter()
            .filter(|tag| other.specialization.contains(tag))
            .count()
    }

    /// Short label for logs and generated text
    pub fn label(&self) -> String {
        format!("{}#{}", self.role, self.id)
    }
}

/// Registry owning every agent, keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRegistry {
    agents: BTreeMap<AgentId, Agent>,
}

impl AgentRegistry {
    /// Build `team_count` debate teams plus the management roster.
    ///
    /// Team members cycle through proposer, solver, adversary, handler.
    /// Identical arguments always produce identical ids, roles and teams.
    pub fn initialize(team_count: u32, agents_per_team: u32, roster: &ManagementRoster) -> Self {
        let mut agents = BTreeMap::new();
        let mut next_id: AgentId = 1;

        for team in 1..=team_count {
            for slot in 0..agents_per_team {
                let role = TEAM_ROLES[slot as usize % TEAM_ROLES.len()];
                agents.insert(next_id, Agent::new(next_id, role, team));
                next_id += 1;
            }
        }

        for role in roster.roles() {
            agents.insert(next_id, Agent::new(next_id, role, MANAGEMENT_TEAM));
            next_id += 1;
        }

        Self { agents }
    }

    /// Build a registry from explicit agent records.
    ///
    /// Fails with `InvalidConfig` when two records share an id.
    pub fn from_agents(records: Vec<Agent>) -> EngineResult<Self> {
        let mut agents = BTreeMap::new();
        for agent in records {
            let id = agent.id;
            if agents.insert(id, agent).is_some() {
                return Err(EngineError::InvalidConfig(format!(
                    "duplicate agent id {}",
                    id
                )));
            }
        }
        Ok(Self { agents })
    }

    pub fn get(&self, id: AgentId) -> EngineResult<&Agent> {
        self.agents.get(&id).ok_or(EngineError::AgentNotFound(id))
    }

    fn get_mut(&mut self, id: AgentId) -> EngineResult<&mut Agent> {
        self.agents
            .get_mut(&id)
            .ok_or(EngineError::AgentNotFound(id))
    }

    /// All agents with the given role, ascending by id
    pub fn all_by_role(&self, role: AgentRole) -> Vec<&Agent> {
        self.agents.values().filter(|a| a.role == role).collect()
    }

    /// Debate-capable agents (proposer, solver, adversary), ascending by id
    pub fn debaters(&self) -> Vec<&Agent> {
        self.agents.values().filter(|a| a.role.is_debater()).collect()
    }

    /// The proposer that breaks tied debate votes: the lowest-id proposer
    pub fn designated_proposer(&self) -> Option<&Agent> {
        self.agents
            .values()
            .find(|a| a.role == AgentRole::Proposer)
    }

    /// Every agent, ascending by id
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn record_debate_win(&mut self, id: AgentId) -> EngineResult<()> {
        self.get_mut(id)?.debate_wins += 1;
        Ok(())
    }

    pub fn record_consensus_vote(&mut self, id: AgentId) -> EngineResult<()> {
        self.get_mut(id)?.consensus_votes += 1;
        Ok(())
    }

    /// Shift performance by `delta`, clamped to [0, 1]
    pub fn adjust_performance(&mut self, id: AgentId, delta: f64) -> EngineResult<()> {
        let agent = self.get_mut(id)?;
        agent.performance = (agent.performance + delta).clamp(0.0, 1.0);
        Ok(())
    }

    /// Record a sanction and lower performance by `penalty`, clamped to [0, 1]
    pub fn record_sanction(&mut self, id: AgentId, penalty: f64) -> EngineResult<()> {
        let agent = self.get_mut(id)?;
        agent.sanctions += 1;
        agent.performance = (agent.performance - penalty.abs()).clamp(0.0, 1.0);
        Ok(())
    }
}
