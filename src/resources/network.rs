//! Network descriptors — VPC with a public/private subnet partition, and the
//! egress-only security group.
//!
//! The VPC expands into the full routing fabric the compute instances need:
//! internet gateway for the public half, one NAT gateway so private subnets
//! can pull container images, and per-half route tables. Each subnet takes a
//! /24 slice of the VPC address space.

use crate::core::graph::{BuildError, CfnResource, Reference};
use crate::core::types::NetworkConfig;
use serde_json::json;

const AZ_SUFFIXES: [char; 4] = ['a', 'b', 'c', 'd'];

/// Parse an IPv4 CIDR block. The prefix must leave room for /24 subnets.
pub fn parse_cidr(cidr: &str) -> Result<([u8; 4], u8), String> {
    let (addr, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| format!("\"{}\" is not CIDR notation", cidr))?;

    let prefix: u8 = prefix
        .parse()
        .map_err(|_| format!("\"{}\" has a non-numeric prefix", cidr))?;
    if prefix > 24 {
        return Err(format!(
            "prefix /{} leaves no room for /24 subnets",
            prefix
        ));
    }

    let octets: Vec<&str> = addr.split('.').collect();
    if octets.len() != 4 {
        return Err(format!("\"{}\" does not have 4 octets", cidr));
    }
    let mut parsed = [0u8; 4];
    for (i, octet) in octets.iter().enumerate() {
        parsed[i] = octet
            .parse()
            .map_err(|_| format!("\"{}\" has an invalid octet \"{}\"", cidr, octet))?;
    }

    Ok((parsed, prefix))
}

/// Check that a block can hold one /24 slice per subnet, two per AZ, without
/// running past the third octet.
pub fn check_subnet_capacity(base: [u8; 4], prefix: u8, max_azs: u8) -> Result<(), String> {
    let needed = u32::from(max_azs) * 2;
    let capacity = 1u32 << (24 - prefix);
    if needed > capacity {
        return Err(format!(
            "a /{} block holds {} /24 subnet(s), but {} AZ(s) need {}",
            prefix, capacity, max_azs, needed
        ));
    }
    if u32::from(base[2]) + needed - 1 > 255 {
        return Err(format!(
            "{} /24 subnets starting at third octet {} run past .255",
            needed, base[2]
        ));
    }
    Ok(())
}

/// The nth /24 slice of a parsed CIDR block. Callers must have checked the
/// block's capacity, so the sum stays within an octet.
fn subnet_cidr(base: [u8; 4], index: u8) -> String {
    let third = u16::from(base[2]) + u16::from(index);
    format!("{}.{}.{}.0/24", base[0], base[1], third)
}

/// The VPC descriptor — address space, subnet partition, routing.
#[derive(Debug, Clone)]
pub struct Vpc {
    logical_id: String,
    region: String,
    cidr: String,
    base: [u8; 4],
    max_azs: u8,
}

impl Vpc {
    pub fn new(logical_id: &str, region: &str, network: &NetworkConfig) -> Result<Self, BuildError> {
        let (base, prefix) = parse_cidr(&network.cidr).map_err(|reason| BuildError::InvalidValue {
            field: "network.cidr".to_string(),
            reason,
        })?;
        if network.max_azs < 1 || network.max_azs > 4 {
            return Err(BuildError::InvalidValue {
                field: "network.max_azs".to_string(),
                reason: format!("must be between 1 and 4, got {}", network.max_azs),
            });
        }
        check_subnet_capacity(base, prefix, network.max_azs).map_err(|reason| {
            BuildError::InvalidValue {
                field: "network.cidr".to_string(),
                reason,
            }
        })?;

        Ok(Self {
            logical_id: logical_id.to_string(),
            region: region.to_string(),
            cidr: network.cidr.clone(),
            base,
            max_azs: network.max_azs,
        })
    }

    /// Reference to the VPC itself.
    pub fn vpc_ref(&self) -> Reference {
        Reference::id(&self.logical_id)
    }

    /// References to the private subnets, one per AZ.
    pub fn private_subnet_refs(&self) -> Vec<Reference> {
        (1..=self.max_azs)
            .map(|i| Reference::id(&format!("{}PrivateSubnet{}", self.logical_id, i)))
            .collect()
    }

    fn az(&self, index: u8) -> String {
        format!("{}{}", self.region, AZ_SUFFIXES[usize::from(index)])
    }

    /// Expand into CloudFormation entries, in an order where every reference
    /// points backwards.
    pub fn resources(&self) -> Vec<CfnResource> {
        let id = &self.logical_id;
        let mut out = Vec::new();

        out.push(CfnResource::new(
            id,
            json!({
                "Type": "AWS::EC2::VPC",
                "Properties": {
                    "CidrBlock": self.cidr,
                    "EnableDnsSupport": true,
                    "EnableDnsHostnames": true,
                }
            }),
        ));

        out.push(CfnResource::new(
            &format!("{id}InternetGateway"),
            json!({ "Type": "AWS::EC2::InternetGateway", "Properties": {} }),
        ));

        out.push(CfnResource::new(
            &format!("{id}GatewayAttachment"),
            json!({
                "Type": "AWS::EC2::VPCGatewayAttachment",
                "Properties": {
                    "VpcId": self.vpc_ref().token(),
                    "InternetGatewayId": Reference::id(&format!("{id}InternetGateway")).token(),
                }
            }),
        ));

        for i in 1..=self.max_azs {
            out.push(CfnResource::new(
                &format!("{id}PublicSubnet{i}"),
                json!({
                    "Type": "AWS::EC2::Subnet",
                    "Properties": {
                        "VpcId": self.vpc_ref().token(),
                        "AvailabilityZone": self.az(i - 1),
                        "CidrBlock": subnet_cidr(self.base, i - 1),
                        "MapPublicIpOnLaunch": true,
                    }
                }),
            ));
        }

        for i in 1..=self.max_azs {
            out.push(CfnResource::new(
                &format!("{id}PrivateSubnet{i}"),
                json!({
                    "Type": "AWS::EC2::Subnet",
                    "Properties": {
                        "VpcId": self.vpc_ref().token(),
                        "AvailabilityZone": self.az(i - 1),
                        "CidrBlock": subnet_cidr(self.base, self.max_azs + i - 1),
                        "MapPublicIpOnLaunch": false,
                    }
                }),
            ));
        }

        out.push(CfnResource::new(
            &format!("{id}PublicRouteTable"),
            json!({
                "Type": "AWS::EC2::RouteTable",
                "Properties": { "VpcId": self.vpc_ref().token() }
            }),
        ));

        // The route must wait for the gateway to be attached.
        out.push(CfnResource::new(
            &format!("{id}PublicDefaultRoute"),
            json!({
                "Type": "AWS::EC2::Route",
                "DependsOn": [format!("{id}GatewayAttachment")],
                "Properties": {
                    "RouteTableId": Reference::id(&format!("{id}PublicRouteTable")).token(),
                    "DestinationCidrBlock": "0.0.0.0/0",
                    "GatewayId": Reference::id(&format!("{id}InternetGateway")).token(),
                }
            }),
        ));

        for i in 1..=self.max_azs {
            out.push(CfnResource::new(
                &format!("{id}PublicSubnet{i}RouteTableAssociation"),
                json!({
                    "Type": "AWS::EC2::SubnetRouteTableAssociation",
                    "Properties": {
                        "SubnetId": Reference::id(&format!("{id}PublicSubnet{i}")).token(),
                        "RouteTableId": Reference::id(&format!("{id}PublicRouteTable")).token(),
                    }
                }),
            ));
        }

        out.push(CfnResource::new(
            &format!("{id}NatEip"),
            json!({
                "Type": "AWS::EC2::EIP",
                "Properties": { "Domain": "vpc" }
            }),
        ));

        out.push(CfnResource::new(
            &format!("{id}NatGateway"),
            json!({
                "Type": "AWS::EC2::NatGateway",
                "Properties": {
                    "AllocationId": Reference::attr(&format!("{id}NatEip"), "AllocationId").token(),
                    "SubnetId": Reference::id(&format!("{id}PublicSubnet1")).token(),
                }
            }),
        ));

        out.push(CfnResource::new(
            &format!("{id}PrivateRouteTable"),
            json!({
                "Type": "AWS::EC2::RouteTable",
                "Properties": { "VpcId": self.vpc_ref().token() }
            }),
        ));

        out.push(CfnResource::new(
            &format!("{id}PrivateDefaultRoute"),
            json!({
                "Type": "AWS::EC2::Route",
                "Properties": {
                    "RouteTableId": Reference::id(&format!("{id}PrivateRouteTable")).token(),
                    "DestinationCidrBlock": "0.0.0.0/0",
                    "NatGatewayId": Reference::id(&format!("{id}NatGateway")).token(),
                }
            }),
        ));

        for i in 1..=self.max_azs {
            out.push(CfnResource::new(
                &format!("{id}PrivateSubnet{i}RouteTableAssociation"),
                json!({
                    "Type": "AWS::EC2::SubnetRouteTableAssociation",
                    "Properties": {
                        "SubnetId": Reference::id(&format!("{id}PrivateSubnet{i}")).token(),
                        "RouteTableId": Reference::id(&format!("{id}PrivateRouteTable")).token(),
                    }
                }),
            ));
        }

        out
    }
}

/// Security group scoped to the VPC, outbound traffic only.
#[derive(Debug, Clone)]
pub struct SecurityGroup {
    logical_id: String,
    vpc: Reference,
}

impl SecurityGroup {
    pub fn new(logical_id: &str, vpc: Reference) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            vpc,
        }
    }

    pub fn group_ref(&self) -> Reference {
        Reference::id(&self.logical_id)
    }

    pub fn resource(&self) -> CfnResource {
        CfnResource::new(
            &self.logical_id,
            json!({
                "Type": "AWS::EC2::SecurityGroup",
                "Properties": {
                    "GroupDescription": "Allow all outbound traffic only",
                    "VpcId": self.vpc.token(),
                    "SecurityGroupEgress": [{
                        "CidrIp": "0.0.0.0/0",
                        "IpProtocol": "-1",
                        "Description": "Allow all outbound traffic",
                    }],
                }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::StackGraph;
    use crate::core::types::NetworkConfig;

    #[test]
    fn test_parse_cidr_ok() {
        assert_eq!(parse_cidr("10.0.0.0/16").unwrap(), ([10, 0, 0, 0], 16));
        assert_eq!(parse_cidr("172.31.0.0/24").unwrap(), ([172, 31, 0, 0], 24));
    }

    #[test]
    fn test_parse_cidr_rejects_narrow_prefix() {
        let err = parse_cidr("10.0.0.0/28").unwrap_err();
        assert!(err.contains("/24 subnets"));
    }

    #[test]
    fn test_parse_cidr_rejects_garbage() {
        assert!(parse_cidr("10.0.0.0").is_err());
        assert!(parse_cidr("10.0.0/16").is_err());
        assert!(parse_cidr("10.0.0.999/16").is_err());
    }

    #[test]
    fn test_subnet_slices() {
        assert_eq!(subnet_cidr([10, 0, 0, 0], 0), "10.0.0.0/24");
        assert_eq!(subnet_cidr([10, 0, 0, 0], 3), "10.0.3.0/24");
    }

    fn make_vpc() -> Vpc {
        Vpc::new("Vpc", "us-west-1", &NetworkConfig::default()).unwrap()
    }

    #[test]
    fn test_capacity_check() {
        assert!(check_subnet_capacity([10, 0, 0, 0], 16, 2).is_ok());
        // A /22 holds exactly the four slices two AZs need
        assert!(check_subnet_capacity([10, 0, 0, 0], 22, 2).is_ok());
        let err = check_subnet_capacity([10, 0, 0, 0], 23, 2).unwrap_err();
        assert!(err.contains("need 4"));
        let err = check_subnet_capacity([10, 0, 0, 0], 24, 1).unwrap_err();
        assert!(err.contains("need 2"));
    }

    #[test]
    fn test_capacity_check_octet_boundary() {
        let err = check_subnet_capacity([10, 0, 255, 0], 16, 2).unwrap_err();
        assert!(err.contains("run past .255"));
    }

    #[test]
    fn test_vpc_rejects_block_too_small_for_subnets() {
        let mut network = NetworkConfig::default();
        network.cidr = "10.0.0.0/24".to_string();
        let err = Vpc::new("Vpc", "us-west-1", &network).unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { .. }));

        network.cidr = "10.0.0.0/23".to_string();
        assert!(Vpc::new("Vpc", "us-west-1", &network).is_err());

        network.cidr = "10.0.0.0/22".to_string();
        assert!(Vpc::new("Vpc", "us-west-1", &network).is_ok());
    }

    #[test]
    fn test_emitted_subnets_stay_inside_the_block() {
        let mut network = NetworkConfig::default();
        network.cidr = "10.0.0.0/22".to_string();
        let vpc = Vpc::new("Vpc", "us-west-1", &network).unwrap();

        // Four subnets, /24 each: exactly 10.0.0.0 through 10.0.3.0
        let mut thirds: Vec<u8> = Vec::new();
        for resource in vpc.resources() {
            if resource.body["Type"] != "AWS::EC2::Subnet" {
                continue;
            }
            let cidr = resource.body["Properties"]["CidrBlock"].as_str().unwrap();
            let (subnet_base, subnet_prefix) = parse_cidr(cidr).unwrap();
            assert_eq!(subnet_prefix, 24);
            assert_eq!(subnet_base[0], 10);
            assert_eq!(subnet_base[1], 0);
            assert!(subnet_base[2] < 4, "{} is outside 10.0.0.0/22", cidr);
            thirds.push(subnet_base[2]);
        }
        thirds.sort_unstable();
        assert_eq!(thirds, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_vpc_rejects_bad_cidr() {
        let mut network = NetworkConfig::default();
        network.cidr = "not-a-cidr".to_string();
        let err = Vpc::new("Vpc", "us-west-1", &network).unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { .. }));
    }

    #[test]
    fn test_vpc_expansion_is_backward_referencing() {
        let vpc = make_vpc();
        let mut graph = StackGraph::new();
        // add() fails on any forward reference, so this is the invariant check
        graph.add_all(vpc.resources()).unwrap();
        assert_eq!(graph.len(), 17);
    }

    #[test]
    fn test_private_subnets_one_per_az() {
        let vpc = make_vpc();
        let refs = vpc.private_subnet_refs();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].target(), "VpcPrivateSubnet1");
        assert_eq!(refs[1].target(), "VpcPrivateSubnet2");
    }

    #[test]
    fn test_subnets_spread_over_azs() {
        let vpc = make_vpc();
        let resources = vpc.resources();
        let public1 = resources
            .iter()
            .find(|r| r.logical_id == "VpcPublicSubnet1")
            .unwrap();
        let private2 = resources
            .iter()
            .find(|r| r.logical_id == "VpcPrivateSubnet2")
            .unwrap();
        assert_eq!(
            public1.body["Properties"]["AvailabilityZone"],
            "us-west-1a"
        );
        assert_eq!(
            private2.body["Properties"]["AvailabilityZone"],
            "us-west-1b"
        );
        assert_eq!(private2.body["Properties"]["CidrBlock"], "10.0.3.0/24");
    }

    #[test]
    fn test_security_group_is_egress_only() {
        let vpc = make_vpc();
        let group = SecurityGroup::new("SecurityGroup", vpc.vpc_ref());
        let body = group.resource().body;
        assert_eq!(body["Properties"]["SecurityGroupEgress"][0]["CidrIp"], "0.0.0.0/0");
        assert!(body["Properties"].get("SecurityGroupIngress").is_none());
    }
}
