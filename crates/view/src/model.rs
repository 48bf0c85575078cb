//! View output model and the in-memory join.

use std::collections::{BTreeMap, HashMap};

use domain::{Agency, AgencyId, Client, ClientId, Reservation, Room, RoomId};
use gateways::Service;
use serde::{Deserialize, Serialize};

/// Which sources answered while the view was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicesStatus {
    pub rooms: bool,
    pub clients: bool,
    pub reservations: bool,
    pub agencies: bool,
}

impl ServicesStatus {
    pub fn set(&mut self, service: Service, up: bool) {
        match service {
            Service::Rooms => self.rooms = up,
            Service::Clients => self.clients = up,
            Service::Reservations => self.reservations = up,
            Service::Agencies => self.agencies = up,
        }
    }

    pub fn is_up(&self, service: Service) -> bool {
        match service {
            Service::Rooms => self.rooms,
            Service::Clients => self.clients,
            Service::Reservations => self.reservations,
            Service::Agencies => self.agencies,
        }
    }

    pub fn all_up(&self) -> bool {
        self.rooms && self.clients && self.reservations && self.agencies
    }
}

/// A reservation joined with its client, room and the room's agency location.
///
/// A foreign key that does not resolve, because the record is gone or its
/// source is down, leaves the field `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedReservation {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub client: Option<Client>,
    pub room: Option<Room>,
    pub agency_location: Option<String>,
}

/// The aggregated view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelView {
    pub rooms: Vec<Room>,
    pub clients: Vec<Client>,
    pub reservations: Vec<Reservation>,
    pub agencies: Vec<Agency>,
    /// Agency id to location.
    pub agencies_map: BTreeMap<AgencyId, String>,
    pub services_status: ServicesStatus,
    /// Non-cancelled reservations only.
    pub enriched_reservations: Vec<EnrichedReservation>,
}

impl HotelView {
    /// Joins the raw collections. Never fails; missing data yields `None`s.
    pub fn assemble(
        rooms: Vec<Room>,
        clients: Vec<Client>,
        reservations: Vec<Reservation>,
        agencies: Vec<Agency>,
        services_status: ServicesStatus,
    ) -> Self {
        let agencies_map: BTreeMap<AgencyId, String> = agencies
            .iter()
            .map(|agency| (agency.id, agency.location.clone()))
            .collect();
        let clients_by_id: HashMap<ClientId, &Client> =
            clients.iter().map(|client| (client.id, client)).collect();
        let rooms_by_id: HashMap<RoomId, &Room> = rooms.iter().map(|room| (room.id, room)).collect();

        let enriched_reservations = reservations
            .iter()
            .filter(|r| r.status().is_active())
            .map(|r| {
                let room = r
                    .room_id()
                    .and_then(|id| rooms_by_id.get(&id))
                    .map(|room| (*room).clone());
                let agency_location = room
                    .as_ref()
                    .and_then(|room| room.agency_id)
                    .and_then(|id| agencies_map.get(&id).cloned());

                EnrichedReservation {
                    reservation: r.clone(),
                    client: clients_by_id.get(&r.client_id()).map(|c| (*c).clone()),
                    room,
                    agency_location,
                }
            })
            .collect();

        Self {
            rooms,
            clients,
            reservations,
            agencies,
            agencies_map,
            services_status,
            enriched_reservations,
        }
    }
}
